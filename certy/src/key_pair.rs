use std::fmt;

#[cfg(feature = "pem")]
use pem::Pem;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, Ed25519KeyPair, KeyPair as RingKeyPair};
use yasna::{DERWriter, DERWriterSeq};

use crate::error::{ConfigurationError, ExternalError};
use crate::sign_algo::{algo::*, SignAlgo, SignatureAlgorithm};
#[cfg(feature = "pem")]
use crate::ENCODE_CONFIG;

/// The kind of key generated for a credential
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyType {
	/// ECDSA over the P-256 curve, signing with SHA-256
	#[default]
	EcdsaP256,
	/// ECDSA over the P-384 curve, signing with SHA-384
	EcdsaP384,
	/// Ed25519
	Ed25519,
}

impl KeyType {
	/// Returns the signature algorithm certificates signed by this key type use
	pub fn algorithm(&self) -> &'static SignatureAlgorithm {
		match self {
			KeyType::EcdsaP256 => &PKCS_ECDSA_P256_SHA256,
			KeyType::EcdsaP384 => &PKCS_ECDSA_P384_SHA384,
			KeyType::Ed25519 => &PKCS_ED25519,
		}
	}
}

#[derive(Debug)]
pub(crate) enum KeyPairKind {
	Ec(EcdsaKeyPair),
	Ed(Ed25519KeyPair),
}

/// A key pair used to sign certificates
#[derive(Debug)]
pub struct KeyPair {
	pub(crate) kind: KeyPairKind,
	pub(crate) alg: &'static SignatureAlgorithm,
	pub(crate) serialized_der: Vec<u8>,
}

impl KeyPair {
	/// Generate a new random [`PKCS_ECDSA_P256_SHA256`] key pair
	pub fn generate() -> Result<Self, ConfigurationError> {
		Self::generate_for(KeyType::default())
	}

	/// Generate a new random key pair of the given type
	pub fn generate_for(key_type: KeyType) -> Result<Self, ConfigurationError> {
		let rng = &SystemRandom::new();
		let alg = key_type.algorithm();

		let pkcs8 = match alg.sign_alg {
			SignAlgo::EcDsa(sign_alg) => EcdsaKeyPair::generate_pkcs8(sign_alg, rng),
			SignAlgo::EdDsa(_sign_alg) => Ed25519KeyPair::generate_pkcs8(rng),
		}
		.map_err(|e| ConfigurationError::KeyGeneration(e.to_string()))?;

		Self::from_pkcs8_der(pkcs8.as_ref(), key_type)
	}

	/// Parses a PKCS#8 DER encoded private key of the given type
	pub fn from_pkcs8_der(pkcs8: &[u8], key_type: KeyType) -> Result<Self, ConfigurationError> {
		let alg = key_type.algorithm();
		let kind = match alg.sign_alg {
			SignAlgo::EcDsa(sign_alg) => {
				KeyPairKind::Ec(EcdsaKeyPair::from_pkcs8(sign_alg, pkcs8, &SystemRandom::new())._err()?)
			},
			SignAlgo::EdDsa(_sign_alg) => {
				KeyPairKind::Ed(Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8)._err()?)
			},
		};
		Ok(KeyPair {
			kind,
			alg,
			serialized_der: pkcs8.to_vec(),
		})
	}

	/// Returns the key pair's signature algorithm
	pub fn algorithm(&self) -> &'static SignatureAlgorithm {
		self.alg
	}

	/// Get the raw public key of this key pair
	///
	/// The key is in raw format, as how [`ring::signature::KeyPair::public_key`]
	/// would output, and how [`ring::signature::UnparsedPublicKey::verify`]
	/// would accept.
	pub fn public_key_raw(&self) -> &[u8] {
		match &self.kind {
			KeyPairKind::Ec(kp) => kp.public_key().as_ref(),
			KeyPairKind::Ed(kp) => kp.public_key().as_ref(),
		}
	}

	/// Return the key pair's public key in DER format
	///
	/// The key is formatted according to the SubjectPublicKeyInfo struct of
	/// X.509.
	/// See [RFC 5280 section 4.1](https://tools.ietf.org/html/rfc5280#section-4.1).
	pub fn public_key_der(&self) -> Vec<u8> {
		yasna::construct_der(|writer| self.serialize_public_key_der(writer))
	}

	pub(crate) fn serialize_public_key_der(&self, writer: DERWriter) {
		writer.write_sequence(|writer| {
			self.alg.write_public_key_alg_ident(writer.next());
			let pk = self.public_key_raw();
			writer.next().write_bitvec_bytes(pk, pk.len() * 8);
		})
	}

	/// Returns a reference to the serialized key pair (including the private key)
	/// in PKCS#8 format in DER
	pub fn serialized_der(&self) -> &[u8] {
		&self.serialized_der
	}

	/// Serializes the key pair (including the private key) in PKCS#8 format in PEM
	#[cfg(feature = "pem")]
	pub fn serialize_pem(&self) -> String {
		let p = Pem::new("PRIVATE KEY", self.serialized_der.clone());
		pem::encode_config(&p, ENCODE_CONFIG)
	}

	/// Wraps the DER written by `f` into a signed `SEQUENCE { data, algorithm, signature }`
	pub(crate) fn sign_der(
		&self,
		f: impl FnOnce(&mut DERWriterSeq<'_>) -> Result<(), ConfigurationError>,
	) -> Result<Vec<u8>, ConfigurationError> {
		yasna::try_construct_der(|writer| {
			writer.write_sequence(|writer| {
				let data = yasna::try_construct_der(|writer| writer.write_sequence(f))?;
				writer.next().write_der(&data);

				// Write signatureAlgorithm
				self.alg.write_alg_ident(writer.next());

				// Write signature
				self.sign(&data, writer.next())?;

				Ok(())
			})
		})
	}

	pub(crate) fn sign(&self, msg: &[u8], writer: DERWriter) -> Result<(), ConfigurationError> {
		let signature = match &self.kind {
			KeyPairKind::Ec(kp) => kp.sign(&SystemRandom::new(), msg)._err()?.as_ref().to_vec(),
			KeyPairKind::Ed(kp) => kp.sign(msg).as_ref().to_vec(),
		};
		writer.write_bitvec_bytes(&signature, signature.len() * 8);
		Ok(())
	}
}

/// Supplies the key pair of a credential
///
/// A provider is asked at most once per credential, the first time its key
/// pair or certificate is needed. Implementations must be thread safe, since
/// credentials may be materialized from several threads.
pub trait KeyPairProvider: fmt::Debug + Send + Sync {
	/// Produces a fresh key pair of the requested type
	fn generate(&self, key_type: KeyType) -> Result<KeyPair, ConfigurationError>;
}

/// Generates key pairs from the operating system's random number generator
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeyPairProvider;

impl KeyPairProvider for SystemKeyPairProvider {
	fn generate(&self, key_type: KeyType) -> Result<KeyPair, ConfigurationError> {
		KeyPair::generate_for(key_type)
	}
}
