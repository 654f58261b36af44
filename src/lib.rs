//! esign-cert - Electronic Signature Certificate Toolkit
//!
//! Loads, inspects, generates and validates the X.509 certificate + private key
//! pairs used to sign tax documents. Identity handling follows the Chilean RUN
//! conventions, where the signer's ID lives either in the subject
//! `serialNumber` or in a Subject Alternative Name `otherName`.
//!
//! # Overview
//!
//! ```text
//! SelfSignedChainBuilder ──key map──> CertificateLoader ──> Certificate ──> CertificateValidator
//!                                                               │
//!                                                        key_normalizer
//! ```
//!
//! - **Normalization**: bare base64 key material gets its PEM framing back
//! - **Lazy Metadata**: certificate fields and RSA parameters are parsed once, on demand
//! - **Test Fixtures**: an in-memory issuer CA signs a subject certificate, packed as PKCS#12
//! - **Pluggable Policies**: validation rules live behind a trait
//!
//! # Quick Start
//!
//! ```no_run
//! use esign_cert::loader::CertificateLoader;
//! use esign_cert::validator::{CertificateValidator, RunCertificateValidator};
//!
//! fn main() -> esign_cert::Result<()> {
//!     let certificate = CertificateLoader::from_file("signer.p12", "secret")?;
//!     RunCertificateValidator::new().validate(&certificate)?;
//!
//!     println!("Signer: {} ({})", certificate.name()?, certificate.id(true)?);
//!     println!("Valid from {} to {}", certificate.valid_from()?, certificate.valid_to()?);
//!     println!("Expires in {} days", certificate.expiration_days(None)?);
//!     Ok(())
//! }
//! ```
//!
//! # Generating Fixtures
//!
//! ```no_run
//! use esign_cert::distinguished_name::{DistinguishedName, DnAttribute};
//! use esign_cert::generate_self_signed_chain::SelfSignedChainBuilder;
//! use esign_cert::loader::CertificateLoader;
//!
//! # fn example() -> esign_cert::Result<()> {
//! let builder = SelfSignedChainBuilder::new()
//!     .subject(DistinguishedName::new().with(DnAttribute::SerialNumber, "10-K"))
//!     .validity_days(365)
//!     .password("fixture");
//!
//! let container = builder.to_pkcs12()?;
//! let certificate = CertificateLoader::from_container_data(&container, "fixture")?;
//! assert_eq!(certificate.id(true)?, "10-K");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every fallible call returns [`Result`], whose error is a single
//! [`CertificateError`]. Branch on [`CertificateError::kind`]:
//!
//! ```no_run
//! use esign_cert::{CertificateLoader, ErrorKind};
//!
//! match CertificateLoader::from_file("signer.p12", "guess") {
//!     Ok(certificate) => println!("loaded {:?}", certificate.name()),
//!     Err(e) if e.kind() == ErrorKind::Container => eprintln!("bad password: {}", e),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! # Logging
//!
//! The crate emits `tracing` events (debug for parsing and generation stages,
//! warn for policy rejections) and never installs a subscriber.

pub mod certificate;
pub mod configs;
pub mod distinguished_name;
pub mod error;
pub mod generate_self_signed_chain;
pub mod key_normalizer;
pub mod loader;
pub mod validator;

pub use certificate::{Certificate, CertificateData, KeyPair, ValidityWindow};
pub use error::{CertificateError, ErrorKind, Result};
pub use generate_self_signed_chain::{ChainStage, SelfSignedChainBuilder};
pub use loader::CertificateLoader;
pub use validator::{CertificateValidator, RunCertificateValidator};
