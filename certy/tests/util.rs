#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use certy::{ConfigurationError, Credential, KeyPair, KeyPairProvider, KeyType, TrustStore};

/// `CN=ca` signs `CN=server-sub-ca`, which signs `CN=test-server`
pub struct Pki {
	pub ca: Credential,
	pub sub_ca: Credential,
	pub server: Credential,
}

pub fn pki() -> Pki {
	let ca = Credential::new().subject("CN=ca");
	let sub_ca = Credential::new()
		.subject("CN=server-sub-ca")
		.issuer(&ca)
		.ca();
	let server = Credential::new()
		.subject("CN=test-server")
		.issuer(&sub_ca)
		.subject_alt_names(["DNS:localhost"]);
	Pki { ca, sub_ca, server }
}

pub fn trust(anchors: &[&Credential]) -> TrustStore {
	TrustStore::new(anchors.iter().map(|cred| cred.certificate().unwrap()))
}

/// Hands out the same key pair every time
#[derive(Debug)]
pub struct FixedKeyPair {
	pkcs8: Vec<u8>,
	key_type: KeyType,
}

impl FixedKeyPair {
	pub fn new(key_type: KeyType) -> Self {
		let key_pair = KeyPair::generate_for(key_type).unwrap();
		FixedKeyPair {
			pkcs8: key_pair.serialized_der().to_vec(),
			key_type,
		}
	}
}

impl KeyPairProvider for FixedKeyPair {
	fn generate(&self, _key_type: KeyType) -> Result<KeyPair, ConfigurationError> {
		KeyPair::from_pkcs8_der(&self.pkcs8, self.key_type)
	}
}

/// Counts how often a key pair was requested
#[derive(Debug, Default)]
pub struct CountingKeyPairs {
	calls: AtomicUsize,
}

impl CountingKeyPairs {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl KeyPairProvider for CountingKeyPairs {
	fn generate(&self, key_type: KeyType) -> Result<KeyPair, ConfigurationError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		KeyPair::generate_for(key_type)
	}
}
