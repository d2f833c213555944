use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::{Duration, OffsetDateTime};

use crate::certificate::Certificate;
#[cfg(feature = "pem")]
use crate::certificate::PemCertifiedKey;
use crate::error::ConfigurationError;
use crate::key_pair::{KeyPair, KeyPairProvider, KeyType, SystemKeyPairProvider};
use crate::materialize;
use crate::{ExtendedKeyUsagePurpose, KeyUsagePurpose, SerialNumber, DEFAULT_VALIDITY};

/// A declarative description of one certificate
///
/// Every builder call returns a new credential with the setting applied and
/// leaves the receiver's materialized state behind, so a credential that was
/// already referenced as an issuer never changes under its children.
/// Configuration never fails: subject and alternative names are parsed, and
/// the issuer and validity are checked, the first time a certificate or key
/// is requested.
///
/// Cloning a credential is cheap and shares its materialized certificate.
///
/// ```
/// use certy::Credential;
///
/// let ca = Credential::new().subject("CN=ca");
/// let server = Credential::new()
/// 	.subject("CN=server")
/// 	.issuer(&ca)
/// 	.subject_alt_names(["DNS:localhost", "IP:127.0.0.1"]);
///
/// let cert = server.certificate().unwrap();
/// assert_eq!(cert.issuer(), ca.certificate().unwrap().subject());
/// assert!(!cert.is_ca());
/// ```
#[derive(Clone)]
pub struct Credential {
	pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
	pub(crate) params: Params,
	state: Mutex<State>,
}

#[derive(Clone)]
pub(crate) struct Params {
	pub(crate) subject: String,
	pub(crate) issuer: Option<Arc<Inner>>,
	pub(crate) is_ca: Option<bool>,
	pub(crate) path_len_constraint: Option<u8>,
	pub(crate) subject_alt_names: Vec<String>,
	pub(crate) not_before: Option<OffsetDateTime>,
	pub(crate) not_after: Option<OffsetDateTime>,
	pub(crate) expires: Duration,
	pub(crate) key_type: KeyType,
	pub(crate) serial_number: Option<SerialNumber>,
	pub(crate) key_usages: Option<Vec<KeyUsagePurpose>>,
	pub(crate) extended_key_usages: Vec<ExtendedKeyUsagePurpose>,
	pub(crate) key_pair_provider: Arc<dyn KeyPairProvider>,
}

/// What a credential caches once it has been materialized
#[derive(Default)]
pub(crate) struct State {
	pub(crate) key_pair: Option<Arc<KeyPair>>,
	pub(crate) certificate: Option<Certificate>,
}

impl Params {
	/// A credential without an issuer is a root and defaults to being a CA
	pub(crate) fn is_ca(&self) -> bool {
		self.is_ca.unwrap_or(self.issuer.is_none())
	}
}

impl Default for Params {
	fn default() -> Self {
		Params {
			subject: String::new(),
			issuer: None,
			is_ca: None,
			path_len_constraint: None,
			subject_alt_names: Vec::new(),
			not_before: None,
			not_after: None,
			expires: DEFAULT_VALIDITY,
			key_type: KeyType::default(),
			serial_number: None,
			key_usages: None,
			extended_key_usages: Vec::new(),
			key_pair_provider: Arc::new(SystemKeyPairProvider),
		}
	}
}

impl Inner {
	fn new(params: Params) -> Arc<Self> {
		Arc::new(Inner {
			params,
			state: Mutex::new(State::default()),
		})
	}

	/// Locks the memoization cell
	///
	/// A panic while holding the lock can't leave a half written state,
	/// since the cell is only assigned after materialization succeeded.
	pub(crate) fn lock_state(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Credential {
	/// Creates a self-signed CA credential with an empty subject
	pub fn new() -> Self {
		Credential {
			inner: Inner::new(Params::default()),
		}
	}

	fn with(self, configure: impl FnOnce(&mut Params)) -> Self {
		let mut params = self.inner.params.clone();
		configure(&mut params);
		Credential {
			inner: Inner::new(params),
		}
	}

	/// Sets the subject distinguished name, e.g. `"CN=server, O=Example"`
	pub fn subject(self, subject: impl Into<String>) -> Self {
		let subject = subject.into();
		self.with(|params| params.subject = subject)
	}

	/// Sets the credential that signs this one
	///
	/// The issuer is captured as it is now; later builder calls on `issuer`
	/// produce new credentials and do not affect this one.
	pub fn issuer(self, issuer: &Credential) -> Self {
		let issuer = Arc::clone(&issuer.inner);
		self.with(|params| params.issuer = Some(issuer))
	}

	/// Marks the credential as a CA without a path length constraint
	pub fn ca(self) -> Self {
		self.with(|params| {
			params.is_ca = Some(true);
			params.path_len_constraint = None;
		})
	}

	/// Marks the credential as a CA that allows at most `path_len`
	/// CA certificates below it
	pub fn path_len(self, path_len: u8) -> Self {
		self.with(|params| {
			params.is_ca = Some(true);
			params.path_len_constraint = Some(path_len);
		})
	}

	/// Marks the credential as an end entity, even when it is self-signed
	pub fn end_entity(self) -> Self {
		self.with(|params| {
			params.is_ca = Some(false);
			params.path_len_constraint = None;
		})
	}

	/// Replaces the subject alternative names
	///
	/// Names are written as `DNS:host`, `IP:addr`, `email:user@host` or
	/// `URI:scheme:...`.
	pub fn subject_alt_names<I, S>(self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let names = names.into_iter().map(Into::into).collect();
		self.with(|params| params.subject_alt_names = names)
	}

	/// Sets the start of the validity interval (defaults to the time of materialization)
	pub fn not_before(self, not_before: OffsetDateTime) -> Self {
		self.with(|params| params.not_before = Some(not_before))
	}

	/// Sets the end of the validity interval (defaults to `not_before` plus [`Credential::expires`])
	pub fn not_after(self, not_after: OffsetDateTime) -> Self {
		self.with(|params| params.not_after = Some(not_after))
	}

	/// Sets the validity period used when no explicit `not_after` is set
	pub fn expires(self, expires: Duration) -> Self {
		self.with(|params| params.expires = expires)
	}

	/// Sets the kind of key generated for this credential
	pub fn key_type(self, key_type: KeyType) -> Self {
		self.with(|params| params.key_type = key_type)
	}

	/// Sets an explicit serial number
	///
	/// Without one, the serial is derived from a hash of the public key.
	pub fn serial(self, serial: impl Into<SerialNumber>) -> Self {
		let serial = serial.into();
		self.with(|params| params.serial_number = Some(serial))
	}

	/// Replaces the default key usages
	pub fn key_usages(self, usages: impl IntoIterator<Item = KeyUsagePurpose>) -> Self {
		let usages = usages.into_iter().collect();
		self.with(|params| params.key_usages = Some(usages))
	}

	/// Sets the extended key usages; none are written by default
	pub fn ext_key_usages(self, usages: impl IntoIterator<Item = ExtendedKeyUsagePurpose>) -> Self {
		let usages = usages.into_iter().collect();
		self.with(|params| params.extended_key_usages = usages)
	}

	/// Uses `provider` instead of the system random number generator for the key pair
	pub fn key_pair_provider(self, provider: Arc<dyn KeyPairProvider>) -> Self {
		self.with(|params| params.key_pair_provider = provider)
	}

	/// Returns the certificate, materializing it and its issuers on first use
	pub fn certificate(&self) -> Result<Certificate, ConfigurationError> {
		materialize::certificate_for(self)
	}

	/// Returns this credential's certificate followed by its issuers'
	/// certificates, excluding the self-signed root
	pub fn certificates(&self) -> Result<Vec<Certificate>, ConfigurationError> {
		materialize::chain_for(self)
	}

	/// Returns the key pair, generating it on first use
	///
	/// The certificate is not materialized, so this succeeds even when the
	/// credential's configuration is invalid.
	pub fn key_pair(&self) -> Result<Arc<KeyPair>, ConfigurationError> {
		materialize::key_pair_for(self)
	}

	/// The certificate chain, leaf first, as concatenated PEM blocks
	#[cfg(feature = "pem")]
	pub fn certificates_pem(&self) -> Result<String, ConfigurationError> {
		let chain = match self.certificates()? {
			chain if chain.is_empty() => vec![self.certificate()?],
			chain => chain,
		};
		Ok(chain.iter().map(Certificate::pem).collect())
	}

	/// The private key in PKCS#8 PEM format
	#[cfg(feature = "pem")]
	pub fn private_key_pem(&self) -> Result<String, ConfigurationError> {
		Ok(self.key_pair()?.serialize_pem())
	}

	/// The PEM chain and private key, ready to be written to disk
	#[cfg(feature = "pem")]
	pub fn pem_certified_key(&self) -> Result<PemCertifiedKey, ConfigurationError> {
		Ok(PemCertifiedKey {
			cert_pem: self.certificates_pem()?,
			private_key_pem: self.private_key_pem()?,
		})
	}
}

impl Default for Credential {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Credential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let params = &self.inner.params;
		f.debug_struct("Credential")
			.field("subject", &params.subject)
			.field("issuer", &params.issuer.as_ref().map(|i| &i.params.subject))
			.field("is_ca", &params.is_ca())
			.field("path_len_constraint", &params.path_len_constraint)
			.field("subject_alt_names", &params.subject_alt_names)
			.finish_non_exhaustive()
	}
}
