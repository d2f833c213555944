use std::fmt;
use std::hash::{Hash, Hasher};

use ring::signature::{self, EcdsaSigningAlgorithm, EdDSAParameters};
use yasna::models::ObjectIdentifier;
use yasna::DERWriter;

use crate::key_pair::KeyType;

#[derive(Clone, Copy, Debug)]
pub(crate) enum SignAlgo {
	EcDsa(&'static EcdsaSigningAlgorithm),
	EdDsa(&'static EdDSAParameters),
}

/// How certificates issued by a [`KeyType`] are signed
///
/// Compared by object identifiers, so two descriptors are equal when they
/// produce identical `AlgorithmIdentifier`s.
#[derive(Clone)]
pub struct SignatureAlgorithm {
	name: &'static str,
	key_type: KeyType,
	/// `AlgorithmIdentifier` of the subjectPublicKeyInfo: key type, then curve
	public_key_oids: &'static [&'static [u64]],
	/// `AlgorithmIdentifier` of the signature
	signature_oid: &'static [u64],
	pub(crate) sign_alg: SignAlgo,
}

impl SignatureAlgorithm {
	/// The conventional name, e.g. `ecdsa-with-SHA256`
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// The key type that produces this algorithm's signatures
	pub fn key_type(&self) -> KeyType {
		self.key_type
	}

	pub(crate) fn write_alg_ident(&self, writer: DERWriter) {
		writer.write_sequence(|writer| {
			writer
				.next()
				.write_oid(&ObjectIdentifier::from_slice(self.signature_oid));
		});
	}

	pub(crate) fn write_public_key_alg_ident(&self, writer: DERWriter) {
		writer.write_sequence(|writer| {
			for oid in self.public_key_oids {
				writer.next().write_oid(&ObjectIdentifier::from_slice(oid));
			}
		});
	}
}

impl fmt::Debug for SignatureAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl PartialEq for SignatureAlgorithm {
	fn eq(&self, other: &Self) -> bool {
		(self.public_key_oids, self.signature_oid) == (other.public_key_oids, other.signature_oid)
	}
}

impl Eq for SignatureAlgorithm {}

impl Hash for SignatureAlgorithm {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.signature_oid.hash(state);
	}
}

/// The supported signature algorithms, one per [`KeyType`]
pub(crate) mod algo {
	use super::*;
	use crate::oid::*;

	/// ECDSA over P-256 with SHA-256, [RFC 5758 section 3.2](https://tools.ietf.org/html/rfc5758#section-3.2)
	pub static PKCS_ECDSA_P256_SHA256: SignatureAlgorithm = SignatureAlgorithm {
		name: "ecdsa-with-SHA256",
		key_type: KeyType::EcdsaP256,
		public_key_oids: &[EC_PUBLIC_KEY, EC_SECP_256_R1],
		signature_oid: ECDSA_WITH_SHA256,
		sign_alg: SignAlgo::EcDsa(&signature::ECDSA_P256_SHA256_ASN1_SIGNING),
	};

	/// ECDSA over P-384 with SHA-384, [RFC 5758 section 3.2](https://tools.ietf.org/html/rfc5758#section-3.2)
	pub static PKCS_ECDSA_P384_SHA384: SignatureAlgorithm = SignatureAlgorithm {
		name: "ecdsa-with-SHA384",
		key_type: KeyType::EcdsaP384,
		public_key_oids: &[EC_PUBLIC_KEY, EC_SECP_384_R1],
		signature_oid: ECDSA_WITH_SHA384,
		sign_alg: SignAlgo::EcDsa(&signature::ECDSA_P384_SHA384_ASN1_SIGNING),
	};

	/// Ed25519, [RFC 8410](https://tools.ietf.org/html/rfc8410)
	pub static PKCS_ED25519: SignatureAlgorithm = SignatureAlgorithm {
		name: "Ed25519",
		key_type: KeyType::Ed25519,
		public_key_oids: &[ED25519],
		signature_oid: ED25519,
		sign_alg: SignAlgo::EdDsa(&signature::ED25519),
	};
}
