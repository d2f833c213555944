//! The set of certificates a verification path may end in

use std::fmt;

use pki_types::CertificateDer;
use x509_parser::prelude::{FromDer, X509Certificate};

/// A trusted root and its raw DER-encoded subject name
struct Anchor {
	der: CertificateDer<'static>,
	subject_raw: Vec<u8>,
}

/// An immutable set of trust anchors
///
/// Anchors are trusted as they are: their signature, CA flag and key usage
/// are not inspected. Their validity period and path length constraint still
/// apply to every path that ends in them.
pub struct TrustStore {
	anchors: Vec<Anchor>,
}

impl TrustStore {
	/// Creates a trust store from DER-encoded certificates
	///
	/// Accepts anything that dereferences to DER bytes, such as a
	/// [`Certificate`](crate::Certificate) or a [`CertificateDer`].
	/// Certificates that can't be parsed are skipped with a warning.
	pub fn new<I, C>(anchors: I) -> Self
	where
		I: IntoIterator<Item = C>,
		C: AsRef<[u8]>,
	{
		let mut store = TrustStore {
			anchors: Vec::new(),
		};
		for der in anchors {
			let der = der.as_ref();
			match X509Certificate::from_der(der) {
				Ok((_, x509)) => {
					let subject_raw = x509.subject().as_raw().to_vec();
					log::trace!("trust anchor {}", x509.subject());
					store.anchors.push(Anchor {
						der: CertificateDer::from(der.to_vec()),
						subject_raw,
					});
				},
				Err(e) => log::warn!("skipping malformed trust anchor: {e}"),
			}
		}
		store
	}

	/// Find the first trusted certificate whose subject matches the given raw issuer name
	pub(crate) fn find_by_subject_raw(&self, subject_raw: &[u8]) -> Option<&CertificateDer<'static>> {
		self.anchors
			.iter()
			.find(|anchor| anchor.subject_raw == subject_raw)
			.map(|anchor| &anchor.der)
	}

	/// Whether a certificate with exactly these DER bytes is an anchor
	pub fn contains(&self, der: &[u8]) -> bool {
		self.anchors.iter().any(|anchor| anchor.der.as_ref() == der)
	}

	/// Iterates over the anchors in the order they were given
	pub fn iter(&self) -> impl Iterator<Item = &CertificateDer<'static>> {
		self.anchors.iter().map(|anchor| &anchor.der)
	}

	/// Number of certificates in the store.
	pub fn len(&self) -> usize {
		self.anchors.len()
	}

	/// Whether the store is empty.
	pub fn is_empty(&self) -> bool {
		self.anchors.is_empty()
	}
}

impl fmt::Debug for TrustStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TrustStore")
			.field("count", &self.anchors.len())
			.finish()
	}
}
