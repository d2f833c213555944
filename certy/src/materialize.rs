//! Turns credentials into signed certificates
//!
//! A credential is materialized at most once. Its issuer is materialized
//! first, then the credential's key pair is generated and its certificate is
//! signed with the issuer's key, or with its own key when it has no issuer.
//! The key pair is kept from the moment it is generated, so it is generated
//! at most once. The certificate is cached only when every step succeeds.

use std::collections::HashSet;
use std::sync::Arc;

use pki_types::CertificateDer;
use ring::digest;
use time::OffsetDateTime;
use yasna::models::ObjectIdentifier;
use yasna::{DERWriter, Tag};

use crate::certificate::Certificate;
use crate::credential::{Credential, Inner, State};
use crate::error::ConfigurationError;
use crate::key_pair::KeyPair;
use crate::name::{write_distinguished_name, write_general_names, DistinguishedName, SanType};
use crate::{
	dt_strip_nanos, oid, write_dt_utc_or_generalized, write_x509_extension,
	ExtendedKeyUsagePurpose, KeyUsagePurpose, SerialNumber,
};

/// Returns the certificate of `credential`, materializing it and its issuers on first use
///
/// Repeated calls return the identical certificate. Concurrent first calls
/// on the same credential materialize it once.
pub fn certificate_for(credential: &Credential) -> Result<Certificate, ConfigurationError> {
	check_issuer_chain(&credential.inner)?;
	let (certificate, _key_pair) = materialize(&credential.inner)?;
	Ok(certificate)
}

/// Returns the certificates from `credential` up to, but excluding, its self-signed root
///
/// The list starts with the credential's own certificate and has one entry
/// per level below the root, so a root yields an empty list.
pub fn chain_for(credential: &Credential) -> Result<Vec<Certificate>, ConfigurationError> {
	check_issuer_chain(&credential.inner)?;
	let mut chain = Vec::new();
	let mut current = &credential.inner;
	while let Some(issuer) = &current.params.issuer {
		let (certificate, _key_pair) = materialize(current)?;
		chain.push(certificate);
		current = issuer;
	}
	Ok(chain)
}

/// Returns the key pair of `credential`, generating it if absent
///
/// Does not require the certificate to be materializable.
pub(crate) fn key_pair_for(credential: &Credential) -> Result<Arc<KeyPair>, ConfigurationError> {
	let inner = &credential.inner;
	let mut state = inner.lock_state();
	ensure_key_pair(inner, &mut state)
}

fn ensure_key_pair(inner: &Inner, state: &mut State) -> Result<Arc<KeyPair>, ConfigurationError> {
	if let Some(key_pair) = &state.key_pair {
		return Ok(Arc::clone(key_pair));
	}
	let params = &inner.params;
	let key_pair = Arc::new(params.key_pair_provider.generate(params.key_type)?);
	state.key_pair = Some(Arc::clone(&key_pair));
	Ok(key_pair)
}

/// Walks the issuer references and fails if one is visited twice
///
/// Issuers are shared handles to credentials that already exist, so the
/// builder can't produce a cycle. This only guards that invariant.
fn check_issuer_chain(inner: &Arc<Inner>) -> Result<(), ConfigurationError> {
	let mut visited = HashSet::new();
	let mut current = inner;
	loop {
		if !visited.insert(Arc::as_ptr(current)) {
			return Err(ConfigurationError::CyclicIssuer {
				subject: inner.params.subject.clone(),
			});
		}
		match &current.params.issuer {
			Some(issuer) => current = issuer,
			None => return Ok(()),
		}
	}
}

/// The issuing side of a signature
struct Issuer<'a> {
	distinguished_name: &'a DistinguishedName,
	key_identifier: Option<&'a [u8]>,
	key_pair: &'a KeyPair,
}

/// Materializes `inner`, holding its lock for the whole computation
///
/// Issuers are locked after their children, never before, so two threads
/// walking overlapping chains can't deadlock.
fn materialize(inner: &Arc<Inner>) -> Result<(Certificate, Arc<KeyPair>), ConfigurationError> {
	let mut state = inner.lock_state();
	if let (Some(certificate), Some(key_pair)) = (&state.certificate, &state.key_pair) {
		return Ok((certificate.clone(), Arc::clone(key_pair)));
	}

	let params = &inner.params;
	let subject: DistinguishedName = params.subject.parse()?;
	let subject_alt_names = params
		.subject_alt_names
		.iter()
		.map(|san| san.parse())
		.collect::<Result<Vec<SanType>, _>>()?;

	let issuer = match &params.issuer {
		Some(issuer) if !issuer.params.is_ca() => {
			return Err(ConfigurationError::IssuerNotCa {
				subject: params.subject.clone(),
				issuer: issuer.params.subject.clone(),
			});
		},
		Some(issuer) => Some(materialize(issuer)?),
		None => None,
	};

	// Issuers are materialized first, so a default not_before never
	// precedes the not_before of an issuer
	let invalid_validity = || ConfigurationError::InvalidValidity {
		subject: params.subject.clone(),
	};
	let not_before = dt_strip_nanos(params.not_before.unwrap_or_else(OffsetDateTime::now_utc));
	let not_after = match params.not_after {
		Some(not_after) => not_after,
		None => not_before
			.checked_add(params.expires)
			.ok_or_else(invalid_validity)?,
	};
	let not_after = dt_strip_nanos(not_after);
	if not_after <= not_before {
		return Err(invalid_validity());
	}

	let key_pair = ensure_key_pair(inner, &mut state)?;
	let spki = key_pair.public_key_der();
	let is_ca = params.is_ca();
	let tbs = TbsCertificate {
		subject,
		subject_alt_names,
		not_before,
		not_after,
		is_ca,
		path_len_constraint: params.path_len_constraint.filter(|_| is_ca),
		serial_number: match &params.serial_number {
			Some(serial) => serial.clone(),
			None => serial_from_spki(&spki),
		},
		key_usages: match &params.key_usages {
			Some(usages) => usages.clone(),
			None if is_ca => vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign],
			None => vec![
				KeyUsagePurpose::DigitalSignature,
				KeyUsagePurpose::KeyEncipherment,
			],
		},
		extended_key_usages: params.extended_key_usages.clone(),
		key_identifier: key_identifier(&spki),
	};

	let der = match &issuer {
		Some((issuer_cert, issuer_key)) => tbs.serialize_der_with_signer(
			&key_pair,
			&Issuer {
				distinguished_name: &issuer_cert.subject,
				key_identifier: Some(issuer_cert.key_identifier.as_slice()),
				key_pair: issuer_key,
			},
		)?,
		None => tbs.serialize_der_with_signer(
			&key_pair,
			&Issuer {
				distinguished_name: &tbs.subject,
				key_identifier: None,
				key_pair: &key_pair,
			},
		)?,
	};

	let certificate = Certificate {
		der,
		issuer: match &issuer {
			Some((issuer_cert, _)) => issuer_cert.subject.clone(),
			None => tbs.subject.clone(),
		},
		subject: tbs.subject,
		serial_number: tbs.serial_number,
		not_before,
		not_after,
		is_ca,
		path_len_constraint: tbs.path_len_constraint,
		subject_alt_names: tbs.subject_alt_names,
		key_identifier: tbs.key_identifier,
		self_signed: issuer.is_none(),
	};
	log::debug!(
		"materialized {:?} issued by {:?} (serial {}, ca: {})",
		certificate.subject.to_string(),
		certificate.issuer.to_string(),
		certificate.serial_number,
		certificate.is_ca,
	);

	state.certificate = Some(certificate.clone());
	Ok((certificate, key_pair))
}

/// RFC 5280 specifies at most 20 bytes for a serial number
fn serial_from_spki(spki: &[u8]) -> SerialNumber {
	let hash = digest::digest(&digest::SHA256, spki);
	let mut sl = hash.as_ref()[0..20].to_vec();
	sl[0] &= 0x7f; // MSB must be 0 to ensure encoding bignum in 20 bytes
	SerialNumber::from_slice(&sl)
}

/// Truncated SHA-256 of the SubjectPublicKeyInfo, as in RFC 7093 section 2
fn key_identifier(spki: &[u8]) -> Vec<u8> {
	let hash = digest::digest(&digest::SHA256, spki);
	hash.as_ref()[0..20].to_vec()
}

/// The resolved contents of a certificate before it is signed
struct TbsCertificate {
	subject: DistinguishedName,
	subject_alt_names: Vec<SanType>,
	not_before: OffsetDateTime,
	not_after: OffsetDateTime,
	is_ca: bool,
	path_len_constraint: Option<u8>,
	serial_number: SerialNumber,
	key_usages: Vec<KeyUsagePurpose>,
	extended_key_usages: Vec<ExtendedKeyUsagePurpose>,
	key_identifier: Vec<u8>,
}

impl TbsCertificate {
	fn serialize_der_with_signer(
		&self,
		pub_key: &KeyPair,
		issuer: &Issuer<'_>,
	) -> Result<CertificateDer<'static>, ConfigurationError> {
		let der = issuer.key_pair.sign_der(|writer| {
			// Write version
			writer.next().write_tagged(Tag::context(0), |writer| {
				writer.write_u8(2);
			});
			// Write serialNumber
			writer
				.next()
				.write_bigint_bytes(self.serial_number.as_ref(), true);
			// Write signature algorithm
			issuer.key_pair.algorithm().write_alg_ident(writer.next());
			// Write issuer name
			write_distinguished_name(writer.next(), issuer.distinguished_name);
			// Write validity
			writer.next().write_sequence(|writer| {
				write_dt_utc_or_generalized(writer.next(), self.not_before);
				write_dt_utc_or_generalized(writer.next(), self.not_after);
			});
			// Write subject
			write_distinguished_name(writer.next(), &self.subject);
			// Write subjectPublicKeyInfo
			pub_key.serialize_public_key_der(writer.next());
			// Write extensions
			writer.next().write_tagged(Tag::context(3), |writer| {
				writer.write_sequence(|writer| {
					if let Some(aki) = issuer.key_identifier {
						write_authority_key_identifier(writer.next(), aki);
					}
					if !self.subject_alt_names.is_empty() {
						self.write_subject_alt_names(writer.next());
					}
					if !self.key_usages.is_empty() {
						self.write_key_usage(writer.next());
					}
					if !self.extended_key_usages.is_empty() {
						self.write_extended_key_usage(writer.next());
					}
					write_x509_extension(writer.next(), oid::SUBJECT_KEY_IDENTIFIER, false, |writer| {
						writer.write_bytes(&self.key_identifier);
					});
					self.write_basic_constraints(writer.next());
				});
			});
			Ok(())
		})?;
		Ok(der.into())
	}

	fn write_subject_alt_names(&self, writer: DERWriter) {
		// Per https://tools.ietf.org/html/rfc5280#section-4.1.2.6, SAN must be marked
		// as critical if subject is empty.
		let critical = self.subject.is_empty();
		write_x509_extension(writer, oid::SUBJECT_ALT_NAME, critical, |writer| {
			write_general_names(writer, &self.subject_alt_names);
		});
	}

	/// Write a certificate's KeyUsage as defined in RFC 5280.
	fn write_key_usage(&self, writer: DERWriter) {
		// RFC 5280 defines 9 key usages
		const KEY_USAGE_BITS: usize = 9;

		// "When present, conforming CAs SHOULD mark this extension as critical."
		write_x509_extension(writer, oid::KEY_USAGE, true, |writer| {
			let bit_string = self
				.key_usages
				.iter()
				.fold(0u16, |bit_string, key_usage| bit_string | key_usage.to_u16());
			writer.write_bitvec_bytes(&bit_string.to_be_bytes(), KEY_USAGE_BITS);
		});
	}

	fn write_extended_key_usage(&self, writer: DERWriter) {
		write_x509_extension(writer, oid::EXT_KEY_USAGE, false, |writer| {
			writer.write_sequence(|writer| {
				for usage in &self.extended_key_usages {
					writer
						.next()
						.write_oid(&ObjectIdentifier::from_slice(usage.oid()));
				}
			});
		});
	}

	fn write_basic_constraints(&self, writer: DERWriter) {
		// Always marked critical, an end entity says so explicitly with cA FALSE
		write_x509_extension(writer, oid::BASIC_CONSTRAINTS, true, |writer| {
			writer.write_sequence(|writer| {
				if self.is_ca {
					writer.next().write_bool(true);
					if let Some(path_len) = self.path_len_constraint {
						writer.next().write_u8(path_len);
					}
				}
			});
		});
	}
}

/// Serializes an X.509v3 authority key identifier extension according to RFC 5280.
fn write_authority_key_identifier(writer: DERWriter, aki: &[u8]) {
	// AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] KeyIdentifier OPTIONAL, ... }
	write_x509_extension(writer, oid::AUTHORITY_KEY_IDENTIFIER, false, |writer| {
		writer.write_sequence(|writer| {
			writer
				.next()
				.write_tagged_implicit(Tag::context(0), |writer| writer.write_bytes(aki))
		});
	});
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use x509_parser::extensions::{GeneralName, ParsedExtension};
	use x509_parser::prelude::{FromDer, X509Certificate};

	use super::*;
	use crate::{date_time_ymd, KeyPairProvider, KeyType};

	#[test]
	fn root_is_self_signed_ca() {
		let ca = Credential::new().subject("CN=ca, O=Crab widgits SE");
		let cert = certificate_for(&ca).unwrap();
		assert!(cert.is_self_signed());
		assert!(cert.is_ca());

		let (_, x509) = X509Certificate::from_der(cert.der()).unwrap();
		assert_eq!(x509.subject().to_string(), "CN=ca, O=Crab widgits SE");
		assert_eq!(x509.subject().as_raw(), x509.issuer().as_raw());
		x509.verify_signature(None).unwrap();
		let bc = x509.basic_constraints().unwrap().unwrap();
		assert!(bc.critical);
		assert!(bc.value.ca);
		assert_eq!(bc.value.path_len_constraint, None);
		assert!(x509.key_usage().unwrap().unwrap().value.key_cert_sign());
		// Self-signed certificates carry no authority key identifier
		assert!(x509
			.extensions()
			.iter()
			.all(|ext| !matches!(ext.parsed_extension(), ParsedExtension::AuthorityKeyIdentifier(_))));
	}

	#[test]
	fn leaf_is_signed_by_issuer() {
		let ca = Credential::new().subject("CN=ca");
		let leaf = Credential::new()
			.subject("CN=leaf")
			.issuer(&ca)
			.subject_alt_names(["DNS:localhost", "IP:127.0.0.1"])
			.ext_key_usages([ExtendedKeyUsagePurpose::ServerAuth]);
		let ca_cert = certificate_for(&ca).unwrap();
		let leaf_cert = certificate_for(&leaf).unwrap();

		let (_, ca_x509) = X509Certificate::from_der(ca_cert.der()).unwrap();
		let (_, x509) = X509Certificate::from_der(leaf_cert.der()).unwrap();
		assert_eq!(x509.issuer().as_raw(), ca_x509.subject().as_raw());
		x509.verify_signature(Some(ca_x509.public_key())).unwrap();

		let bc = x509.basic_constraints().unwrap().unwrap();
		assert!(!bc.value.ca);
		let ku = x509.key_usage().unwrap().unwrap().value;
		assert!(ku.digital_signature() && ku.key_encipherment());
		assert!(!ku.key_cert_sign());
		assert!(x509.extended_key_usage().unwrap().unwrap().value.server_auth);

		let san = x509.subject_alternative_name().unwrap().unwrap();
		assert!(!san.critical);
		assert_eq!(san.value.general_names.len(), 2);
		assert!(matches!(san.value.general_names[0], GeneralName::DNSName("localhost")));
		assert!(matches!(san.value.general_names[1], GeneralName::IPAddress(&[127, 0, 0, 1])));

		let aki = x509
			.extensions()
			.iter()
			.find_map(|ext| match ext.parsed_extension() {
				ParsedExtension::AuthorityKeyIdentifier(aki) => aki.key_identifier.clone(),
				_ => None,
			})
			.unwrap();
		assert_eq!(aki.0, ca_cert.key_identifier());
	}

	#[test]
	fn explicit_serial_and_validity() {
		let leaf = Credential::new()
			.subject("CN=dated")
			.serial(0x0102_0304u64)
			.not_before(date_time_ymd(2019, 1, 1))
			.not_after(date_time_ymd(2020, 1, 1));
		let cert = certificate_for(&leaf).unwrap();
		assert_eq!(cert.serial_number().to_bytes(), vec![1, 2, 3, 4]);

		let (_, x509) = X509Certificate::from_der(cert.der()).unwrap();
		assert_eq!(x509.raw_serial(), &[1, 2, 3, 4]);
		assert_eq!(
			x509.validity().not_before.timestamp(),
			date_time_ymd(2019, 1, 1).unix_timestamp()
		);
		assert_eq!(
			x509.validity().not_after.timestamp(),
			date_time_ymd(2020, 1, 1).unix_timestamp()
		);
	}

	#[test]
	fn default_validity_spans_now() {
		let cert = certificate_for(&Credential::new().subject("CN=now")).unwrap();
		let now = OffsetDateTime::now_utc();
		assert!(cert.not_before() <= now);
		assert!(cert.not_after() > now);
		assert_eq!(cert.not_after() - cert.not_before(), crate::DEFAULT_VALIDITY);
	}

	#[test]
	fn path_len_is_written() {
		let ca = Credential::new().subject("CN=ca").path_len(0);
		let cert = certificate_for(&ca).unwrap();
		let (_, x509) = X509Certificate::from_der(cert.der()).unwrap();
		let bc = x509.basic_constraints().unwrap().unwrap();
		assert_eq!(bc.value.path_len_constraint, Some(0));
		assert_eq!(cert.path_len_constraint(), Some(0));
	}

	#[test]
	fn empty_subject_marks_san_critical() {
		let cert = certificate_for(&Credential::new().subject_alt_names(["DNS:example.com"])).unwrap();
		let (_, x509) = X509Certificate::from_der(cert.der()).unwrap();
		assert!(x509.subject_alternative_name().unwrap().unwrap().critical);
	}

	#[test]
	fn ed25519_and_p384_issuers() {
		let ca = Credential::new().subject("CN=ca").key_type(KeyType::Ed25519);
		let leaf = Credential::new()
			.subject("CN=leaf")
			.issuer(&ca)
			.key_type(KeyType::EcdsaP384);
		let ca_cert = certificate_for(&ca).unwrap();
		let leaf_cert = certificate_for(&leaf).unwrap();
		let (_, ca_x509) = X509Certificate::from_der(ca_cert.der()).unwrap();
		let (_, x509) = X509Certificate::from_der(leaf_cert.der()).unwrap();
		x509.verify_signature(Some(ca_x509.public_key())).unwrap();
	}

	#[test]
	fn chain_excludes_root() {
		let ca = Credential::new().subject("CN=ca");
		let sub = Credential::new().subject("CN=sub").issuer(&ca).ca();
		let leaf = Credential::new().subject("CN=leaf").issuer(&sub);

		assert!(chain_for(&ca).unwrap().is_empty());
		let chain = chain_for(&leaf).unwrap();
		let subjects: Vec<_> = chain.iter().map(|c| c.subject().to_string()).collect();
		assert_eq!(subjects, ["CN=leaf", "CN=sub"]);
		assert_eq!(chain[1], certificate_for(&sub).unwrap());
	}

	#[test]
	fn issuer_not_ca() {
		let ca = Credential::new().subject("CN=ca");
		let not_ca = Credential::new().subject("CN=not-ca").issuer(&ca);
		let leaf = Credential::new().subject("CN=leaf").issuer(&not_ca);
		assert_eq!(
			certificate_for(&leaf).unwrap_err(),
			ConfigurationError::IssuerNotCa {
				subject: "CN=leaf".into(),
				issuer: "CN=not-ca".into(),
			}
		);
		// Nothing was cached for the failing credential
		assert!(leaf.inner.lock_state().certificate.is_none());
	}

	#[test]
	fn invalid_validity() {
		let cred = Credential::new()
			.subject("CN=backwards")
			.not_before(date_time_ymd(2020, 1, 1))
			.not_after(date_time_ymd(2019, 1, 1));
		assert!(matches!(
			certificate_for(&cred),
			Err(ConfigurationError::InvalidValidity { .. })
		));

		let empty = Credential::new()
			.not_before(date_time_ymd(2020, 1, 1))
			.not_after(date_time_ymd(2020, 1, 1));
		assert!(matches!(
			certificate_for(&empty),
			Err(ConfigurationError::InvalidValidity { .. })
		));
	}

	#[test]
	fn bad_names_surface_at_materialization() {
		let cred = Credential::new().subject("not a dn");
		assert!(matches!(
			certificate_for(&cred),
			Err(ConfigurationError::InvalidSubject(_))
		));
		let cred = Credential::new().subject_alt_names(["DNS:"]);
		assert!(matches!(
			certificate_for(&cred),
			Err(ConfigurationError::InvalidSubjectAltName(_))
		));
	}

	#[derive(Debug, Default)]
	struct CountingProvider {
		calls: AtomicUsize,
	}

	impl KeyPairProvider for CountingProvider {
		fn generate(&self, key_type: KeyType) -> Result<KeyPair, ConfigurationError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			KeyPair::generate_for(key_type)
		}
	}

	#[test]
	fn key_pair_generated_once() {
		let provider = Arc::new(CountingProvider::default());
		let ca = Credential::new()
			.subject("CN=ca")
			.key_pair_provider(provider.clone());
		let first = certificate_for(&ca).unwrap();
		let second = certificate_for(&ca).unwrap();
		assert_eq!(first.der(), second.der());
		key_pair_for(&ca).unwrap();
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn key_pair_outlives_failed_materialization() {
		let provider = Arc::new(CountingProvider::default());
		let backwards = Credential::new()
			.subject("CN=backwards")
			.key_pair_provider(provider.clone())
			.not_before(date_time_ymd(2020, 1, 1))
			.not_after(date_time_ymd(2019, 1, 1));

		let key_pair = key_pair_for(&backwards).unwrap();
		assert!(matches!(
			certificate_for(&backwards),
			Err(ConfigurationError::InvalidValidity { .. })
		));
		assert!(backwards.inner.lock_state().certificate.is_none());
		assert!(Arc::ptr_eq(&key_pair, &key_pair_for(&backwards).unwrap()));
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn certificate_uses_key_pair_generated_earlier() {
		let provider = Arc::new(CountingProvider::default());
		let cred = Credential::new()
			.subject("CN=early")
			.key_pair_provider(provider.clone());
		let key_pair = key_pair_for(&cred).unwrap();
		let cert = certificate_for(&cred).unwrap();
		let (_, x509) = X509Certificate::from_der(cert.der()).unwrap();
		assert_eq!(x509.public_key().raw, key_pair.public_key_der());
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn shared_issuer_is_not_a_cycle() {
		let ca = Credential::new().subject("CN=ca");
		let left = Credential::new().subject("CN=left").issuer(&ca).ca();
		let right = Credential::new().subject("CN=right").issuer(&ca).ca();
		let leaf = Credential::new().subject("CN=leaf").issuer(&left);
		assert!(check_issuer_chain(&leaf.inner).is_ok());
		assert!(check_issuer_chain(&right.inner).is_ok());
		assert!(check_issuer_chain(&ca.inner).is_ok());
	}

	#[derive(Debug)]
	struct FailingProvider;

	impl KeyPairProvider for FailingProvider {
		fn generate(&self, _key_type: KeyType) -> Result<KeyPair, ConfigurationError> {
			Err(ConfigurationError::KeyGeneration("no entropy".into()))
		}
	}

	#[test]
	fn provider_failure_is_not_cached() {
		let cred = Credential::new()
			.subject("CN=unlucky")
			.key_pair_provider(Arc::new(FailingProvider));
		assert_eq!(
			certificate_for(&cred).unwrap_err(),
			ConfigurationError::KeyGeneration("no entropy".into())
		);
		let state = cred.inner.lock_state();
		assert!(state.certificate.is_none() && state.key_pair.is_none());
	}
}
