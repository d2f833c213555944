#[cfg(feature = "pem")]
use std::fs::File;
#[cfg(feature = "pem")]
use std::io;
#[cfg(feature = "pem")]
use std::path::Path;

#[cfg(feature = "pem")]
use pem::Pem;
use pki_types::CertificateDer;
use time::OffsetDateTime;

use crate::name::{DistinguishedName, SanType};
use crate::oid;
#[cfg(feature = "pem")]
use crate::ENCODE_CONFIG;
use crate::SerialNumber;

/// A materialized, signed certificate
///
/// Alongside the DER bytes it keeps the values it was built from, so tests
/// can inspect a certificate without parsing it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
	pub(crate) der: CertificateDer<'static>,
	pub(crate) subject: DistinguishedName,
	pub(crate) issuer: DistinguishedName,
	pub(crate) serial_number: SerialNumber,
	pub(crate) not_before: OffsetDateTime,
	pub(crate) not_after: OffsetDateTime,
	pub(crate) is_ca: bool,
	pub(crate) path_len_constraint: Option<u8>,
	pub(crate) subject_alt_names: Vec<SanType>,
	pub(crate) key_identifier: Vec<u8>,
	pub(crate) self_signed: bool,
}

impl Certificate {
	/// Get the certificate in DER encoded format.
	///
	/// [`CertificateDer`] implements `Deref<Target = [u8]>` and `AsRef<[u8]>`, so you can easily
	/// extract the DER bytes from the return value.
	pub fn der(&self) -> &CertificateDer<'static> {
		&self.der
	}

	/// Get the certificate in PEM encoded format.
	#[cfg(feature = "pem")]
	pub fn pem(&self) -> String {
		pem::encode_config(&Pem::new("CERTIFICATE", self.der().to_vec()), ENCODE_CONFIG)
	}

	/// The subject distinguished name
	pub fn subject(&self) -> &DistinguishedName {
		&self.subject
	}

	/// The issuer distinguished name, copied from the issuing credential's subject
	pub fn issuer(&self) -> &DistinguishedName {
		&self.issuer
	}

	/// Whether the certificate was signed with its own key
	pub fn is_self_signed(&self) -> bool {
		self.self_signed
	}

	/// The serial number
	pub fn serial_number(&self) -> &SerialNumber {
		&self.serial_number
	}

	/// Start of the validity interval, truncated to whole seconds
	pub fn not_before(&self) -> OffsetDateTime {
		self.not_before
	}

	/// End of the validity interval, truncated to whole seconds
	pub fn not_after(&self) -> OffsetDateTime {
		self.not_after
	}

	/// Whether the basic constraints mark this certificate as a CA
	pub fn is_ca(&self) -> bool {
		self.is_ca
	}

	/// The path length constraint of a CA certificate
	pub fn path_len_constraint(&self) -> Option<u8> {
		self.path_len_constraint
	}

	/// The subject alternative names, in the order they were configured
	pub fn subject_alt_names(&self) -> &[SanType] {
		&self.subject_alt_names
	}

	/// The subject key identifier written into the certificate
	pub fn key_identifier(&self) -> &[u8] {
		&self.key_identifier
	}
}

impl From<Certificate> for CertificateDer<'static> {
	fn from(cert: Certificate) -> Self {
		cert.der
	}
}

impl AsRef<[u8]> for Certificate {
	fn as_ref(&self) -> &[u8] {
		self.der.as_ref()
	}
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
/// One of the purposes contained in the [extended key usage extension](https://tools.ietf.org/html/rfc5280#section-4.2.1.12)
pub enum ExtendedKeyUsagePurpose {
	/// anyExtendedKeyUsage
	Any,
	/// id-kp-serverAuth
	ServerAuth,
	/// id-kp-clientAuth
	ClientAuth,
	/// id-kp-codeSigning
	CodeSigning,
	/// id-kp-emailProtection
	EmailProtection,
	/// id-kp-timeStamping
	TimeStamping,
	/// id-kp-OCSPSigning
	OcspSigning,
	/// A custom purpose not from the pre-specified list of purposes
	Other(Vec<u64>),
}

impl ExtendedKeyUsagePurpose {
	pub(crate) fn oid(&self) -> &[u64] {
		use ExtendedKeyUsagePurpose::*;
		match self {
			// anyExtendedKeyUsage
			Any => &[2, 5, 29, 37, 0],
			ServerAuth => oid::KP_SERVER_AUTH,
			ClientAuth => oid::KP_CLIENT_AUTH,
			CodeSigning => oid::KP_CODE_SIGNING,
			EmailProtection => oid::KP_EMAIL_PROTECTION,
			TimeStamping => oid::KP_TIME_STAMPING,
			OcspSigning => oid::KP_OCSP_SIGNING,
			Other(custom) => custom,
		}
	}
}

/// PEM serialized certificate chain and private key of one credential
#[cfg(feature = "pem")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemCertifiedKey {
	/// The certificate followed by its issuing chain, leaf first
	pub cert_pem: String,
	/// The PKCS#8 private key
	pub private_key_pem: String,
}

#[cfg(feature = "pem")]
impl PemCertifiedKey {
	/// Writes `<name>.pem` and `<name>.key.pem` into `dir`, creating it if needed
	pub fn write(&self, dir: &Path, name: &str) -> Result<(), io::Error> {
		use std::io::Write;
		std::fs::create_dir_all(dir)?;

		let key_path = dir.join(format!("{name}.key.pem"));
		let mut key_out = File::create(key_path)?;
		write!(key_out, "{}", &self.private_key_pem)?;

		let cert_path = dir.join(format!("{name}.pem"));
		let mut cert_out = File::create(cert_path)?;
		write!(cert_out, "{}", &self.cert_pem)?;

		Ok(())
	}
}
