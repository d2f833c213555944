use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use yasna::models::ObjectIdentifier;
use yasna::{DERWriter, Tag};

use crate::error::ConfigurationError;
use crate::oid;

/// The attribute type of a distinguished name entry
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
#[non_exhaustive]
pub enum DnType {
	/// X520countryName
	CountryName,
	/// X520LocalityName
	LocalityName,
	/// X520StateOrProvinceName
	StateOrProvinceName,
	/// X520OrganizationName
	OrganizationName,
	/// X520OrganizationalUnitName
	OrganizationalUnitName,
	/// X520CommonName
	CommonName,
	/// streetAddress
	StreetAddress,
	/// domainComponent
	DomainComponent,
	/// userId
	UserId,
	/// Custom distinguished name type
	CustomDnType(Vec<u64>),
}

impl DnType {
	pub(crate) fn to_oid(&self) -> ObjectIdentifier {
		let sl = match self {
			DnType::CountryName => oid::COUNTRY_NAME,
			DnType::LocalityName => oid::LOCALITY_NAME,
			DnType::StateOrProvinceName => oid::STATE_OR_PROVINCE_NAME,
			DnType::OrganizationName => oid::ORG_NAME,
			DnType::OrganizationalUnitName => oid::ORG_UNIT_NAME,
			DnType::CommonName => oid::COMMON_NAME,
			DnType::StreetAddress => oid::STREET_ADDRESS,
			DnType::DomainComponent => oid::DOMAIN_COMPONENT,
			DnType::UserId => oid::USER_ID,
			DnType::CustomDnType(ref oid) => oid.as_slice(),
		};
		ObjectIdentifier::from_slice(sl)
	}

	/// Looks up the RFC 4514 short name (`CN`, `O`, ...), case-insensitively
	pub fn from_short_name(name: &str) -> Option<Self> {
		Some(match name.to_ascii_uppercase().as_str() {
			"C" => DnType::CountryName,
			"L" => DnType::LocalityName,
			"ST" => DnType::StateOrProvinceName,
			"O" => DnType::OrganizationName,
			"OU" => DnType::OrganizationalUnitName,
			"CN" => DnType::CommonName,
			"STREET" => DnType::StreetAddress,
			"DC" => DnType::DomainComponent,
			"UID" => DnType::UserId,
			_ => return None,
		})
	}

	fn short_name(&self) -> Option<&'static str> {
		Some(match self {
			DnType::CountryName => "C",
			DnType::LocalityName => "L",
			DnType::StateOrProvinceName => "ST",
			DnType::OrganizationName => "O",
			DnType::OrganizationalUnitName => "OU",
			DnType::CommonName => "CN",
			DnType::StreetAddress => "STREET",
			DnType::DomainComponent => "DC",
			DnType::UserId => "UID",
			DnType::CustomDnType(_) => return None,
		})
	}
}

/**
Distinguished name used e.g. for the issuer and subject fields of a certificate

A distinguished name is an ordered sequence of (attribute type, attribute value)
pairs. The order is kept as written and is the order in which the relative
distinguished names are encoded, so `"CN=server, O=Acme"` encodes the common
name first.

See also the RFC 5280 sections on the [issuer](https://tools.ietf.org/html/rfc5280#section-4.1.2.4)
and [subject](https://tools.ietf.org/html/rfc5280#section-4.1.2.6) fields.
*/
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone)]
pub struct DistinguishedName {
	entries: Vec<(DnType, String)>,
}

impl DistinguishedName {
	/// Creates a new, empty distinguished name
	pub fn new() -> Self {
		Self::default()
	}
	/// Appends an attribute
	///
	/// Repeated attribute types are kept, as is common for `DC`.
	pub fn push(&mut self, ty: DnType, s: impl Into<String>) {
		self.entries.push((ty, s.into()));
	}
	/// Obtains the first attribute value for the given attribute type
	pub fn get(&self, ty: &DnType) -> Option<&str> {
		self.entries
			.iter()
			.find(|(t, _)| t == ty)
			.map(|(_, v)| v.as_str())
	}
	/// Iterate over the entries
	pub fn iter(&self) -> impl Iterator<Item = (&DnType, &str)> {
		self.entries.iter().map(|(t, v)| (t, v.as_str()))
	}
	/// Returns true when the name has no attributes
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl FromStr for DistinguishedName {
	type Err = ConfigurationError;

	/// Parses `"CN=ca, O=Acme"` style names
	///
	/// Attribute types are the RFC 4514 short names, matched
	/// case-insensitively. A backslash escapes the next character, so
	/// `"CN=Doe\, John"` is a single attribute. The empty string parses to an
	/// empty name.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || ConfigurationError::InvalidSubject(s.to_string());
		let mut dn = DistinguishedName::new();
		if s.trim().is_empty() {
			return Ok(dn);
		}
		for part in split_unescaped(s, ',') {
			let (ty, value) = part.split_once('=').ok_or_else(invalid)?;
			let ty = DnType::from_short_name(ty.trim()).ok_or_else(invalid)?;
			let value = unescape(value.trim());
			if value.is_empty() {
				return Err(invalid());
			}
			dn.push(ty, value);
		}
		Ok(dn)
	}
}

impl fmt::Display for DistinguishedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (ty, value)) in self.entries.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			match ty.short_name() {
				Some(name) => write!(f, "{name}=")?,
				None => {
					let components: Vec<_> = ty.to_oid().components().iter().map(u64::to_string).collect();
					write!(f, "{}=", components.join("."))?
				},
			}
			for c in value.chars() {
				if matches!(c, ',' | '\\' | '+' | '=') {
					write!(f, "\\")?;
				}
				write!(f, "{c}")?;
			}
		}
		Ok(())
	}
}

fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut start = 0;
	let mut escaped = false;
	for (i, c) in s.char_indices() {
		match c {
			_ if escaped => escaped = false,
			'\\' => escaped = true,
			c if c == sep => {
				parts.push(&s[start..i]);
				start = i + c.len_utf8();
			},
			_ => {},
		}
	}
	parts.push(&s[start..]);
	parts
}

fn unescape(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	let mut chars = s.chars();
	while let Some(c) = chars.next() {
		match c {
			'\\' => out.extend(chars.next()),
			c => out.push(c),
		}
	}
	out
}

pub(crate) fn write_distinguished_name(writer: DERWriter, dn: &DistinguishedName) {
	writer.write_sequence(|writer| {
		for (ty, content) in dn.iter() {
			writer.next().write_set(|writer| {
				writer.next().write_sequence(|writer| {
					writer.next().write_oid(&ty.to_oid());
					writer.next().write_utf8_string(content);
				});
			});
		}
	});
}

/// The type of subject alt name
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum SanType {
	/// Also known as E-Mail address
	Rfc822Name(String),
	DnsName(String),
	URI(String),
	IpAddress(IpAddr),
}

impl SanType {
	pub(crate) fn tag(&self) -> u64 {
		// Defined in the GeneralName list in
		// https://tools.ietf.org/html/rfc5280#page-38
		const TAG_RFC822_NAME: u64 = 1;
		const TAG_DNS_NAME: u64 = 2;
		const TAG_URI: u64 = 6;
		const TAG_IP_ADDRESS: u64 = 7;

		match self {
			SanType::Rfc822Name(_name) => TAG_RFC822_NAME,
			SanType::DnsName(_name) => TAG_DNS_NAME,
			SanType::URI(_name) => TAG_URI,
			SanType::IpAddress(_addr) => TAG_IP_ADDRESS,
		}
	}
}

impl FromStr for SanType {
	type Err = ConfigurationError;

	/// Parses typed names as written by OpenSSL-style tools
	///
	/// Accepted prefixes (case-insensitive) are `DNS:`, `IP:`, `email:` and
	/// `URI:`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || ConfigurationError::InvalidSubjectAltName(s.to_string());
		let (kind, value) = s.split_once(':').ok_or_else(invalid)?;
		let value = value.trim();
		let ia5 = |v: &str| !v.is_empty() && v.is_ascii() && !v.contains(char::is_whitespace);
		let san = match kind.trim().to_ascii_lowercase().as_str() {
			"dns" if ia5(value) => SanType::DnsName(value.to_string()),
			"ip" => SanType::IpAddress(value.parse().map_err(|_| invalid())?),
			"email" if ia5(value) && value.contains('@') => SanType::Rfc822Name(value.to_string()),
			"uri" if ia5(value) => SanType::URI(value.to_string()),
			_ => return Err(invalid()),
		};
		Ok(san)
	}
}

impl fmt::Display for SanType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SanType::Rfc822Name(name) => write!(f, "email:{name}"),
			SanType::DnsName(name) => write!(f, "DNS:{name}"),
			SanType::URI(name) => write!(f, "URI:{name}"),
			SanType::IpAddress(addr) => write!(f, "IP:{addr}"),
		}
	}
}

pub(crate) fn write_general_names(writer: DERWriter, names: &[SanType]) {
	writer.write_sequence(|writer| {
		for san in names {
			writer
				.next()
				.write_tagged_implicit(Tag::context(san.tag()), |writer| match san {
					SanType::Rfc822Name(name) | SanType::DnsName(name) | SanType::URI(name) => {
						writer.write_ia5_string(name.as_str())
					},
					SanType::IpAddress(IpAddr::V4(addr)) => writer.write_bytes(&addr.octets()),
					SanType::IpAddress(IpAddr::V6(addr)) => writer.write_bytes(&addr.octets()),
				});
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_distinguished_name() {
		let dn: DistinguishedName = "cn=server-sub-ca, O=Crab widgits SE".parse().unwrap();
		let entries: Vec<_> = dn.iter().collect();
		assert_eq!(
			entries,
			vec![
				(&DnType::CommonName, "server-sub-ca"),
				(&DnType::OrganizationName, "Crab widgits SE")
			]
		);
		assert_eq!(dn.to_string(), "CN=server-sub-ca, O=Crab widgits SE");
	}

	#[test]
	fn parse_escaped_comma() {
		let dn: DistinguishedName = r"CN=Doe\, John, DC=example, DC=com".parse().unwrap();
		assert_eq!(dn.get(&DnType::CommonName), Some("Doe, John"));
		assert_eq!(dn.iter().count(), 3);
		assert_eq!(dn.to_string(), r"CN=Doe\, John, DC=example, DC=com");
	}

	#[test]
	fn reject_bad_distinguished_names() {
		for bad in ["CN", "XX=foo", "CN=", "CN=a,,O=b"] {
			assert_eq!(
				bad.parse::<DistinguishedName>(),
				Err(ConfigurationError::InvalidSubject(bad.to_string())),
				"{bad}"
			);
		}
		assert!("".parse::<DistinguishedName>().unwrap().is_empty());
	}

	#[test]
	fn parse_san_types() {
		assert_eq!(
			"DNS:localhost".parse::<SanType>().unwrap(),
			SanType::DnsName("localhost".into())
		);
		assert_eq!(
			"ip:127.0.0.1".parse::<SanType>().unwrap(),
			SanType::IpAddress("127.0.0.1".parse().unwrap())
		);
		assert_eq!(
			"IP:::1".parse::<SanType>().unwrap(),
			SanType::IpAddress("::1".parse().unwrap())
		);
		assert_eq!(
			"email:crab@example.com".parse::<SanType>().unwrap(),
			SanType::Rfc822Name("crab@example.com".into())
		);
		assert_eq!(
			"URI:spiffe://example.com/crab".parse::<SanType>().unwrap(),
			SanType::URI("spiffe://example.com/crab".into())
		);
	}

	#[test]
	fn reject_bad_san_types() {
		for bad in ["localhost", "DNS:", "IP:300.1.1.1", "email:nobody", "X400:foo", "DNS:a b"] {
			assert!(bad.parse::<SanType>().is_err(), "{bad}");
		}
	}
}
