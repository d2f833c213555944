use std::fmt;

/// Errors raised while materializing a [`Credential`](crate::Credential)
///
/// These are caller-fixable mistakes in the credential description. The
/// builder never fails; every check is deferred to the first request for a
/// certificate, and a failed materialization leaves nothing cached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigurationError {
	/// Walking the issuer references of a credential came back to itself
	#[error("issuer chain of {subject:?} is cyclic")]
	CyclicIssuer {
		/// Subject of the credential whose issuer walk revisited a credential
		subject: String,
	},
	/// A credential names an issuer that is not marked as a CA
	#[error("issuer {issuer:?} of {subject:?} is not a CA")]
	IssuerNotCa {
		/// Subject of the credential being materialized
		subject: String,
		/// Subject of the offending issuer
		issuer: String,
	},
	/// `not_after` is not strictly after `not_before`
	#[error("validity interval of {subject:?} is empty: not_after must be after not_before")]
	InvalidValidity {
		/// Subject of the credential being materialized
		subject: String,
	},
	/// The subject string is not a valid distinguished name
	#[error("invalid distinguished name {0:?}")]
	InvalidSubject(String),
	/// A subject alternative name entry is not a valid typed name
	#[error("invalid subject alternative name {0:?}")]
	InvalidSubjectAltName(String),
	/// The key pair provider failed to produce a key pair
	#[error("key generation failed: {0}")]
	KeyGeneration(String),
	/// The crypto backend failed to sign a certificate
	#[error("signing failed: {0}")]
	Signing(String),
}

/// Identifies one certificate of a candidate verification path
///
/// `depth` counts from the leaf (depth 0) towards the trust anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRef {
	/// Position in the path, 0 being the leaf
	pub depth: usize,
	/// Subject distinguished name, RFC 4514 style
	pub subject: String,
}

impl fmt::Display for CertificateRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "certificate at depth {} ({})", self.depth, self.subject)
	}
}

/// The verdict of a failed chain verification
///
/// Verification failure is an ordinary outcome and is returned by value.
/// Every variant identifies the certificate that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VerificationError {
	/// No trust anchor has a subject matching the issuer of the topmost certificate
	#[error("{0}: issuer is not a trusted root")]
	UntrustedRoot(CertificateRef),
	/// The issuer name of a certificate differs from the subject of its parent
	#[error("{0}: issuer name does not match the subject of the next certificate")]
	IssuerMismatch(CertificateRef),
	/// The signature does not verify under the parent's public key
	#[error("{0}: signature is invalid")]
	SignatureInvalid(CertificateRef),
	/// A non-anchor certificate signed another certificate without being a CA
	#[error("{0}: used as an issuer but is not a CA")]
	NotCa(CertificateRef),
	/// More CA certificates sit below a CA than its path length constraint allows
	#[error("{0}: path length constraint exceeded")]
	PathLenExceeded(CertificateRef),
	/// The verification time is after `not_after`
	#[error("{0}: certificate has expired")]
	Expired(CertificateRef),
	/// The verification time is before `not_before`
	#[error("{0}: certificate is not yet valid")]
	NotYetValid(CertificateRef),
	/// The leaf does not carry the requested subject alternative name
	#[error("{0}: no subject alternative name matches")]
	NameMismatch(CertificateRef),
	/// The certificate bytes could not be parsed
	#[error("{0}: malformed certificate")]
	Malformed(CertificateRef),
}

impl VerificationError {
	/// Returns the certificate that triggered the failure
	pub fn certificate(&self) -> &CertificateRef {
		match self {
			Self::UntrustedRoot(cert)
			| Self::IssuerMismatch(cert)
			| Self::SignatureInvalid(cert)
			| Self::NotCa(cert)
			| Self::PathLenExceeded(cert)
			| Self::Expired(cert)
			| Self::NotYetValid(cert)
			| Self::NameMismatch(cert)
			| Self::Malformed(cert) => cert,
		}
	}
}

/// Maps crypto backend errors into [`ConfigurationError`]
pub(crate) trait ExternalError<T>: Sized {
	fn _err(self) -> Result<T, ConfigurationError>;
}

impl<T> ExternalError<T> for Result<T, ring::error::Unspecified> {
	fn _err(self) -> Result<T, ConfigurationError> {
		self.map_err(|e| ConfigurationError::Signing(e.to_string()))
	}
}

impl<T> ExternalError<T> for Result<T, ring::error::KeyRejected> {
	fn _err(self) -> Result<T, ConfigurationError> {
		self.map_err(|e| ConfigurationError::KeyGeneration(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verification_error_names_the_certificate() {
		let err = VerificationError::Expired(CertificateRef {
			depth: 0,
			subject: "CN=expired-client".into(),
		});
		assert_eq!(err.certificate().depth, 0);
		assert_eq!(
			err.to_string(),
			"certificate at depth 0 (CN=expired-client): certificate has expired"
		);
	}
}
