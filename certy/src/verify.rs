//! Verification of a certificate chain against a [`TrustStore`]
//!
//! The verifier checks exactly one candidate path, the leaf followed by the
//! supplied chain and the matching trust anchor, and stops at the first
//! failing check. Checks run in this order:
//!
//! 1. locate the anchor whose subject matches the issuer of the topmost certificate
//! 2. per link, leaf first: issuer name, signature, CA flag of the parent
//! 3. path length constraints
//! 4. validity periods, leaf first
//! 5. the requested subject alternative name, if any

use std::net::IpAddr;

use pki_types::CertificateDer;
use time::OffsetDateTime;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{CertificateRef, VerificationError};
use crate::name::SanType;
use crate::trust_store::TrustStore;

/// The certificates of a successfully verified path, leaf first, anchor last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
	certificates: Vec<CertificateDer<'static>>,
}

impl ValidatedPath {
	/// The verified leaf certificate
	pub fn leaf(&self) -> &CertificateDer<'static> {
		&self.certificates[0]
	}

	/// The trust anchor the path ends in
	pub fn anchor(&self) -> &CertificateDer<'static> {
		&self.certificates[self.certificates.len() - 1]
	}

	/// All certificates of the path, leaf first
	pub fn certificates(&self) -> &[CertificateDer<'static>] {
		&self.certificates
	}

	/// Number of certificates in the path, including leaf and anchor
	pub fn len(&self) -> usize {
		self.certificates.len()
	}

	/// Always false, a validated path holds at least the leaf and the anchor
	pub fn is_empty(&self) -> bool {
		self.certificates.is_empty()
	}
}

/// Verifies certificate chains against a [`TrustStore`]
///
/// Verification time defaults to the current time, and no subject
/// alternative name is required unless [`ChainVerifier::expect_name`] is set.
#[derive(Debug, Clone)]
pub struct ChainVerifier<'a> {
	trust: &'a TrustStore,
	at: Option<OffsetDateTime>,
	expected_name: Option<SanType>,
}

/// Verifies `leaf` and `chain` against `trust` at time `at`
///
/// Shorthand for [`ChainVerifier::new`] with [`ChainVerifier::at`].
pub fn verify<L, C>(
	leaf: L,
	chain: &[C],
	trust: &TrustStore,
	at: OffsetDateTime,
) -> Result<ValidatedPath, VerificationError>
where
	L: AsRef<[u8]>,
	C: AsRef<[u8]>,
{
	ChainVerifier::new(trust).at(at).verify(leaf, chain)
}

impl<'a> ChainVerifier<'a> {
	/// Creates a verifier that accepts paths ending in an anchor of `trust`
	pub fn new(trust: &'a TrustStore) -> Self {
		ChainVerifier {
			trust,
			at: None,
			expected_name: None,
		}
	}

	/// Checks validity periods at `at` instead of the current time
	pub fn at(mut self, at: OffsetDateTime) -> Self {
		self.at = Some(at);
		self
	}

	/// Requires the leaf to carry a subject alternative name matching `name`
	///
	/// DNS names compare case-insensitively, and a leftmost `*` label in the
	/// certificate matches exactly one label of `name`.
	pub fn expect_name(mut self, name: SanType) -> Self {
		self.expected_name = Some(name);
		self
	}

	/// Verifies `leaf`, issued by `chain[0]`, issued by `chain[1]` and so on
	///
	/// The chain may start with the leaf itself and may end with the trust
	/// anchor that issued the certificate before it; both duplicates are
	/// skipped, so the output of
	/// [`Credential::certificates`](crate::Credential::certificates) can be
	/// passed as is.
	pub fn verify<L, C>(&self, leaf: L, chain: &[C]) -> Result<ValidatedPath, VerificationError>
	where
		L: AsRef<[u8]>,
		C: AsRef<[u8]>,
	{
		let result = self.verify_path(leaf.as_ref(), chain);
		match &result {
			Ok(path) => log::debug!("verified path of {} certificates", path.len()),
			Err(e) => log::debug!("verification failed: {e}"),
		}
		result
	}

	fn verify_path<C: AsRef<[u8]>>(
		&self,
		leaf: &[u8],
		chain: &[C],
	) -> Result<ValidatedPath, VerificationError> {
		let mut ders: Vec<&[u8]> = vec![leaf];
		let mut chain: Vec<&[u8]> = chain.iter().map(AsRef::as_ref).collect();
		if chain.first() == Some(&leaf) {
			chain.remove(0);
		}
		// A trailing anchor is only dropped when it issued the entry below it
		if let Some(top) = chain.last().copied() {
			let below = match chain.len() {
				1 => leaf,
				n => chain[n - 2],
			};
			if self.anchor_for(below).is_some_and(|anchor| anchor.as_ref() == top) {
				chain.pop();
			}
		}
		ders.extend(chain);

		let mut path = Vec::with_capacity(ders.len() + 1);
		for (depth, der) in ders.iter().copied().enumerate() {
			path.push(parse(der, depth)?);
		}

		// 1. Locate the anchor
		let top = &path[path.len() - 1];
		let anchor_der = self
			.trust
			.find_by_subject_raw(top.x509.issuer().as_raw())
			.ok_or_else(|| VerificationError::UntrustedRoot(top.reference()))?;
		ders.push(anchor_der.as_ref());
		let anchor_depth = path.len();
		path.push(parse(anchor_der, anchor_depth)?);

		// 2. Links between each certificate and its parent
		for (depth, pair) in path.windows(2).enumerate() {
			let (child, parent) = (&pair[0], &pair[1]);
			if child.x509.issuer().as_raw() != parent.x509.subject().as_raw() {
				return Err(VerificationError::IssuerMismatch(child.reference()));
			}
			if child
				.x509
				.verify_signature(Some(parent.x509.public_key()))
				.is_err()
			{
				return Err(VerificationError::SignatureInvalid(child.reference()));
			}
			if depth + 1 != anchor_depth && !parent.is_ca() {
				return Err(VerificationError::NotCa(parent.reference()));
			}
			log::trace!("{} is signed by {}", child.subject, parent.subject);
		}

		// 3. Path length constraints, counting the CA certificates between
		// each constrained CA and the leaf
		for (depth, cert) in path.iter().enumerate().skip(1) {
			let Some(path_len) = cert.path_len_constraint() else {
				continue;
			};
			let below = path[1..depth].iter().filter(|c| c.is_ca()).count();
			if below as u64 > u64::from(path_len) {
				return Err(VerificationError::PathLenExceeded(cert.reference()));
			}
		}

		// 4. Validity periods, closest to the leaf first
		let now = self.at.unwrap_or_else(OffsetDateTime::now_utc);
		for cert in &path {
			let validity = cert.x509.validity();
			if now < validity.not_before.to_datetime() {
				return Err(VerificationError::NotYetValid(cert.reference()));
			}
			if now > validity.not_after.to_datetime() {
				return Err(VerificationError::Expired(cert.reference()));
			}
		}

		// 5. Subject alternative name of the leaf
		if let Some(expected) = &self.expected_name {
			if !san_matches(&path[0].x509, expected) {
				return Err(VerificationError::NameMismatch(path[0].reference()));
			}
		}

		Ok(ValidatedPath {
			certificates: ders
				.into_iter()
				.map(|der| CertificateDer::from(der.to_vec()))
				.collect(),
		})
	}

	/// The anchor that issued `der`, if `der` parses and one is trusted
	fn anchor_for(&self, der: &[u8]) -> Option<&'a CertificateDer<'static>> {
		let (_, x509) = X509Certificate::from_der(der).ok()?;
		self.trust.find_by_subject_raw(x509.issuer().as_raw())
	}
}

/// A parsed certificate and its position in the candidate path
struct PathEntry<'a> {
	depth: usize,
	subject: String,
	x509: X509Certificate<'a>,
}

impl PathEntry<'_> {
	fn reference(&self) -> CertificateRef {
		CertificateRef {
			depth: self.depth,
			subject: self.subject.clone(),
		}
	}

	fn is_ca(&self) -> bool {
		matches!(self.x509.basic_constraints(), Ok(Some(bc)) if bc.value.ca)
	}

	fn path_len_constraint(&self) -> Option<u32> {
		match self.x509.basic_constraints() {
			Ok(Some(bc)) if bc.value.ca => bc.value.path_len_constraint,
			_ => None,
		}
	}
}

fn parse(der: &[u8], depth: usize) -> Result<PathEntry<'_>, VerificationError> {
	match X509Certificate::from_der(der) {
		Ok((_, x509)) => Ok(PathEntry {
			depth,
			subject: x509.subject().to_string(),
			x509,
		}),
		Err(_) => Err(VerificationError::Malformed(CertificateRef {
			depth,
			subject: String::new(),
		})),
	}
}

fn san_matches(x509: &X509Certificate<'_>, expected: &SanType) -> bool {
	let Ok(Some(san)) = x509.subject_alternative_name() else {
		return false;
	};
	san.value
		.general_names
		.iter()
		.any(|name| match (name, expected) {
			(GeneralName::DNSName(presented), SanType::DnsName(reference)) => {
				dns_name_matches(presented, reference)
			},
			(GeneralName::IPAddress(octets), SanType::IpAddress(IpAddr::V4(addr))) => {
				*octets == &addr.octets()[..]
			},
			(GeneralName::IPAddress(octets), SanType::IpAddress(IpAddr::V6(addr))) => {
				*octets == &addr.octets()[..]
			},
			(GeneralName::RFC822Name(presented), SanType::Rfc822Name(reference)) => {
				presented.eq_ignore_ascii_case(reference)
			},
			(GeneralName::URI(presented), SanType::URI(reference)) => *presented == reference.as_str(),
			_ => false,
		})
}

/// Matches a reference DNS name against a presented one, which may start with a `*` label
fn dns_name_matches(presented: &str, reference: &str) -> bool {
	let presented = presented.trim_end_matches('.').to_ascii_lowercase();
	let reference = reference.trim_end_matches('.').to_ascii_lowercase();
	match presented.strip_prefix("*.") {
		Some(suffix) => match reference.split_once('.') {
			Some((label, rest)) => !label.is_empty() && rest == suffix,
			None => false,
		},
		None => presented == reference,
	}
}
