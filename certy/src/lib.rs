/*!
Declarative X.509 certificate hierarchies for tests

This crate lets tests describe a PKI (a root authority, intermediate
authorities and leaf certificates) with a fluent [`Credential`] builder. It
materializes the description into real signed certificates on first use and
checks a leaf against a [`TrustStore`] with a small [`ChainVerifier`].

Certificates are generated lazily: building a [`Credential`] never fails,
and every configuration mistake surfaces as a [`ConfigurationError`] the
first time a certificate is requested. Failed verification is an ordinary
[`VerificationError`] value that names the offending certificate.
*/
#![cfg_attr(
	feature = "pem",
	doc = r##"
## Example

```
use certy::{Credential, TrustStore, ChainVerifier, SanType};
# fn main () {
let ca = Credential::new().subject("CN=ca");
let intermediate = Credential::new()
	.subject("CN=server-sub-ca")
	.issuer(&ca)
	.ca();
let server = Credential::new()
	.subject("CN=test-server")
	.issuer(&intermediate)
	.subject_alt_names(["DNS:localhost"]);

let trust = TrustStore::new([ca.certificate().unwrap()]);
let path = ChainVerifier::new(&trust)
	.expect_name(SanType::DnsName("localhost".into()))
	.verify(server.certificate().unwrap(), &server.certificates().unwrap())
	.unwrap();
assert_eq!(path.len(), 3);
println!("{}", server.certificates_pem().unwrap());
# }
```"##
)]
#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]
#![deny(missing_docs)]
#![allow(clippy::complexity, clippy::style, clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::fmt;

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use yasna::models::{GeneralizedTime, ObjectIdentifier, UTCTime};
use yasna::DERWriter;

#[cfg(feature = "pem")]
pub use crate::certificate::PemCertifiedKey;
pub use crate::certificate::{Certificate, ExtendedKeyUsagePurpose};
pub use crate::credential::Credential;
pub use crate::error::{CertificateRef, ConfigurationError, VerificationError};
pub use crate::key_pair::{KeyPair, KeyPairProvider, KeyType, SystemKeyPairProvider};
pub use crate::materialize::{certificate_for, chain_for};
pub use crate::name::{DistinguishedName, DnType, SanType};
pub use crate::sign_algo::algo::*;
pub use crate::sign_algo::SignatureAlgorithm;
pub use crate::trust_store::TrustStore;
pub use crate::verify::{verify, ChainVerifier, ValidatedPath};

mod certificate;
mod credential;
mod error;
mod key_pair;
mod materialize;
mod name;
mod oid;
mod sign_algo;
mod trust_store;
mod verify;

/// Validity period of a credential that sets no explicit `not_after`
pub const DEFAULT_VALIDITY: time::Duration = time::Duration::days(365);

#[cfg(feature = "pem")]
const ENCODE_CONFIG: pem::EncodeConfig = {
	let line_ending = match cfg!(target_family = "windows") {
		true => pem::LineEnding::CRLF,
		false => pem::LineEnding::LF,
	};
	pem::EncodeConfig::new().set_line_ending(line_ending)
};

/// One of the purposes contained in the [key usage](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.3) extension
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum KeyUsagePurpose {
	/// digitalSignature
	DigitalSignature,
	/// contentCommitment / nonRepudiation
	ContentCommitment,
	/// keyEncipherment
	KeyEncipherment,
	/// dataEncipherment
	DataEncipherment,
	/// keyAgreement
	KeyAgreement,
	/// keyCertSign
	KeyCertSign,
	/// cRLSign
	CrlSign,
	/// encipherOnly
	EncipherOnly,
	/// decipherOnly
	DecipherOnly,
}

impl KeyUsagePurpose {
	/// Encode a key usage as the leading bits of a big endian u16
	fn to_u16(self) -> u16 {
		const FLAG: u16 = 0b1000_0000_0000_0000;
		FLAG >> match self {
			KeyUsagePurpose::DigitalSignature => 0,
			KeyUsagePurpose::ContentCommitment => 1,
			KeyUsagePurpose::KeyEncipherment => 2,
			KeyUsagePurpose::DataEncipherment => 3,
			KeyUsagePurpose::KeyAgreement => 4,
			KeyUsagePurpose::KeyCertSign => 5,
			KeyUsagePurpose::CrlSign => 6,
			KeyUsagePurpose::EncipherOnly => 7,
			KeyUsagePurpose::DecipherOnly => 8,
		}
	}
}

/// A certificate serial number
///
/// Serial numbers are written as positive DER integers; the caller is
/// responsible for keeping them unique per issuer.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SerialNumber {
	inner: Vec<u8>,
}

impl SerialNumber {
	/// Create a serial number from the given byte slice
	pub fn from_slice(bytes: &[u8]) -> SerialNumber {
		let inner = bytes.to_vec();
		SerialNumber { inner }
	}

	/// Return the byte representation of the serial number
	pub fn to_bytes(&self) -> Vec<u8> {
		self.inner.clone()
	}
}

impl AsRef<[u8]> for SerialNumber {
	fn as_ref(&self) -> &[u8] {
		&self.inner
	}
}

impl fmt::Display for SerialNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let hex: Vec<_> = self.inner.iter().map(|b| format!("{:02x}", b)).collect();
		write!(f, "{}", hex.join(":"))
	}
}

impl From<u64> for SerialNumber {
	fn from(u: u64) -> SerialNumber {
		let bytes = u.to_be_bytes();
		// Leading zero bytes would make the DER integer non-minimal
		let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
		SerialNumber::from_slice(&bytes[first..])
	}
}

/// Helper to obtain an `OffsetDateTime` from year, month, day values
///
/// The year, month, day values are assumed to be in UTC.
///
/// This helper function serves two purposes: first, so that you don't
/// have to import the time crate yourself in order to specify date
/// information, second so that users don't have to type unproportionately
/// long code just to generate an instance of [`OffsetDateTime`].
pub fn date_time_ymd(year: i32, month: u8, day: u8) -> OffsetDateTime {
	let month = Month::try_from(month).expect("out-of-range month");
	let primitive_dt = PrimitiveDateTime::new(
		Date::from_calendar_date(year, month, day).expect("invalid or out-of-range date"),
		Time::MIDNIGHT,
	);
	primitive_dt.assume_utc()
}

/// Drops the sub-second part, which neither UTCTime nor DER GeneralizedTime carry
pub(crate) fn dt_strip_nanos(dt: OffsetDateTime) -> OffsetDateTime {
	dt.replace_nanosecond(0).unwrap_or(dt)
}

pub(crate) fn write_dt_utc_or_generalized(writer: DERWriter, dt: OffsetDateTime) {
	// RFC 5280 section 4.1.2.5: UTCTime through 2049, GeneralizedTime from
	// 2050 on. UTCTime can't represent years before 1950 either.
	let dt = dt_strip_nanos(dt);
	if (1950..2050).contains(&dt.year()) {
		writer.write_utctime(&UTCTime::from_datetime(dt));
	} else {
		writer.write_generalized_time(&GeneralizedTime::from_datetime(dt));
	}
}

/// Serializes an X.509v3 extension according to RFC 5280
pub(crate) fn write_x509_extension(
	writer: DERWriter,
	extension_oid: &[u64],
	is_critical: bool,
	value_serializer: impl FnOnce(DERWriter),
) {
	// Extension  ::=  SEQUENCE  {
	//      extnID      OBJECT IDENTIFIER,
	//      critical    BOOLEAN DEFAULT FALSE,
	//      extnValue   OCTET STRING }
	writer.write_sequence(|writer| {
		let oid = ObjectIdentifier::from_slice(extension_oid);
		writer.next().write_oid(&oid);
		if is_critical {
			writer.next().write_bool(true);
		}
		let bytes = yasna::construct_der(value_serializer);
		writer.next().write_bytes(&bytes);
	})
}
