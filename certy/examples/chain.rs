//! Build a three level PKI, verify the server chain, then verify an
//! expired copy of the server certificate.
//!
//! Run with:
//!
//!     $ cargo run --example chain
//!
//! Pass a directory as first argument to also write the PEM files there.

use std::error::Error;
use std::path::Path;

use certy::{date_time_ymd, Certificate, ChainVerifier, Credential, SanType, TrustStore};

fn describe(cert: &Certificate) {
	println!("  subject:  {}", cert.subject());
	println!("  issuer:   {}", cert.issuer());
	println!("  serial:   {}", cert.serial_number());
	println!("  validity: {} .. {}", cert.not_before(), cert.not_after());
	println!("  ca:       {} {:?}", cert.is_ca(), cert.path_len_constraint());
	for san in cert.subject_alt_names() {
		println!("  san:      {}", san);
	}
}

fn main() -> Result<(), Box<dyn Error>> {
	let ca = Credential::new().subject("CN=ca");
	let sub_ca = Credential::new()
		.subject("CN=server-sub-ca")
		.issuer(&ca)
		.ca();
	let server = Credential::new()
		.subject("CN=test-server")
		.issuer(&sub_ca)
		.subject_alt_names(["DNS:localhost"]);

	for cert in server.certificates()? {
		println!("certificate");
		describe(&cert);
	}

	let trust = TrustStore::new([ca.certificate()?]);
	let verifier = ChainVerifier::new(&trust).expect_name(SanType::DnsName("localhost".into()));

	let path = verifier.verify(server.certificate()?, &server.certificates()?)?;
	println!("verified path of {} certificates", path.len());

	let expired = server
		.not_before(date_time_ymd(2019, 1, 1))
		.not_after(date_time_ymd(2020, 1, 1));
	match verifier.verify(expired.certificate()?, &expired.certificates()?) {
		Ok(_) => println!("expired certificate unexpectedly verified"),
		Err(e) => println!("expired certificate rejected: {e}"),
	}

	if let Some(dir) = std::env::args().nth(1) {
		let dir = Path::new(&dir);
		ca.pem_certified_key()?.write(dir, "ca")?;
		sub_ca.pem_certified_key()?.write(dir, "server-sub-ca")?;
		expired.pem_certified_key()?.write(dir, "test-server-expired")?;
		println!("wrote PEM files to {}", dir.display());
	}

	Ok(())
}
