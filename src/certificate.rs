//! Electronic-signature certificate entity
//!
//! A [`Certificate`] owns a normalized PEM certificate and private key. Nothing
//! is parsed on construction: the X.509 fields and the RSA key parameters are
//! derived on first access and memoized for the lifetime of the instance.
//!
//! # Identity extraction
//! The signer's national ID (RUN) lives in one of two places depending on the
//! issuing authority:
//! 1. the subject `serialNumber` attribute;
//! 2. a Subject Alternative Name `otherName` entry holding an IA5String.
//!
//! [`Certificate::id`] tries [`ID_STRATEGIES`] in that order.
//!
//! # Example
//! ```rust,no_run
//! use esign_cert::loader::CertificateLoader;
//! # fn example() -> esign_cert::Result<()> {
//! let certificate = CertificateLoader::from_file("signer.p12", "secret")?;
//! println!("{} <{}>", certificate.name()?, certificate.email()?);
//! println!("RUN {} valid until {}", certificate.id(true)?, certificate.valid_to()?);
//! # Ok(())
//! # }
//! ```

use crate::distinguished_name::{DistinguishedName, DnAttribute};
use crate::error::{openssl_err, CertificateError, ErrorKind, Result};
use crate::key_normalizer::{
    normalize_private_key, normalize_public_key, strip_pem_markers, wrap_pem_body,
    DEFAULT_WRAP_WIDTH,
};
use crate::validator::CertificateValidator;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};
use tracing::debug;
use x509_parser::asn1_rs::{Any, Class, FromDer, Ia5String, Tag};
use x509_parser::extensions::{GeneralName, ParsedExtension};

/// Fixed-width local date-time layout used by [`Certificate::valid_from`] and [`Certificate::valid_to`]
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const END_OF_DAY: &str = "T23:59:59";

/// PEM certificate and private key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    #[serde(alias = "publicKey")]
    pub cert: String,
    #[serde(alias = "privateKey")]
    pub pkey: String,
}

/// Certificate validity bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// A Subject Alternative Name `otherName` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherName {
    pub oid: String,
    /// Decoded value when it is an IA5String
    pub value: Option<String>,
}

/// Fields parsed out of the certificate, owned so they can be memoized
#[derive(Debug, Clone)]
pub struct CertificateData {
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub validity: ValidityWindow,
    /// Upper-case hex
    pub serial_number: String,
    pub other_names: Vec<OtherName>,
    /// Dotted OIDs of every extension present
    pub extensions: Vec<String>,
}

impl CertificateData {
    fn parse(pem: &str) -> Result<Self> {
        let x509 = X509::from_pem(pem.as_bytes())
            .map_err(openssl_err(ErrorKind::Parse, "Failed to parse certificate"))?;

        let subject = DistinguishedName::from_x509_name(x509.subject_name())?;
        let issuer = DistinguishedName::from_x509_name(x509.issuer_name())?;
        let serial_number = x509
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_hex_str().map(|hex| hex.to_string()))
            .map_err(openssl_err(ErrorKind::Parse, "Failed to read serial number"))?;

        let der = x509
            .to_der()
            .map_err(openssl_err(ErrorKind::Parse, "Failed to encode certificate"))?;
        let (_, parsed) = x509_parser::parse_x509_certificate(&der).map_err(|e| {
            CertificateError::new(
                ErrorKind::Parse,
                format!("Failed to parse certificate DER: {:?}", e),
            )
        })?;

        let validity = ValidityWindow {
            not_before: utc_from_timestamp(parsed.validity().not_before.timestamp())?,
            not_after: utc_from_timestamp(parsed.validity().not_after.timestamp())?,
        };
        if validity.not_before > validity.not_after {
            return Err(CertificateError::new(
                ErrorKind::Parse,
                "Certificate notBefore is later than notAfter",
            ));
        }

        let mut other_names = Vec::new();
        let mut extensions = Vec::new();
        for extension in parsed.extensions() {
            extensions.push(extension.oid.to_id_string());
            if let ParsedExtension::SubjectAlternativeName(san) = extension.parsed_extension() {
                for general_name in &san.general_names {
                    if let GeneralName::OtherName(oid, value) = general_name {
                        other_names.push(OtherName {
                            oid: oid.to_id_string(),
                            value: ia5_string_value(value),
                        });
                    }
                }
            }
        }

        Ok(Self {
            subject,
            issuer,
            validity,
            serial_number,
            other_names,
            extensions,
        })
    }
}

fn utc_from_timestamp(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| {
        CertificateError::new(
            ErrorKind::Parse,
            format!("Certificate time {} is out of range", seconds),
        )
    })
}

/// Decode the `[0] EXPLICIT IA5String` value of an otherName
fn ia5_string_value(value: &[u8]) -> Option<String> {
    let (_, mut any) = Any::from_der(value).ok()?;
    if any.class() == Class::ContextSpecific && any.tag() == Tag(0) {
        (_, any) = Any::from_der(any.data).ok()?;
    }
    Ia5String::try_from(any).ok().map(|value| value.string())
}

/// Where a certificate ID can be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    SubjectSerialNumber,
    SanOtherName,
}

/// Extraction order used by [`Certificate::id`]
pub const ID_STRATEGIES: [IdSource; 2] = [IdSource::SubjectSerialNumber, IdSource::SanOtherName];

impl IdSource {
    fn extract(self, data: &CertificateData) -> Option<String> {
        let raw = match self {
            IdSource::SubjectSerialNumber => data
                .subject
                .get(DnAttribute::SerialNumber)
                .map(str::to_string),
            IdSource::SanOtherName => data
                .other_names
                .iter()
                .find_map(|other| other.value.clone()),
        }?;
        Some(raw.trim().trim_start_matches('0').to_string())
    }
}

struct RsaParameters {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

/// Certificate and private key with lazily derived metadata
pub struct Certificate {
    keys: KeyPair,
    data: OnceCell<CertificateData>,
    rsa: OnceCell<RsaParameters>,
}

impl Certificate {
    /// Wrap a certificate and private key, adding PEM framing where missing
    pub fn new(public_key: &str, private_key: &str) -> Self {
        Self {
            keys: KeyPair {
                cert: normalize_public_key(public_key, DEFAULT_WRAP_WIDTH),
                pkey: normalize_private_key(private_key, DEFAULT_WRAP_WIDTH),
            },
            data: OnceCell::new(),
            rsa: OnceCell::new(),
        }
    }

    /// Both keys; `clean` strips the PEM markers and surrounding whitespace
    pub fn keys(&self, clean: bool) -> KeyPair {
        if clean {
            KeyPair {
                cert: strip_pem_markers(&self.keys.cert),
                pkey: strip_pem_markers(&self.keys.pkey),
            }
        } else {
            self.keys.clone()
        }
    }

    pub fn public_key(&self) -> &str {
        &self.keys.cert
    }

    pub fn private_key(&self) -> &str {
        &self.keys.pkey
    }

    pub fn x509(&self) -> Result<X509> {
        X509::from_pem(self.keys.cert.as_bytes())
            .map_err(openssl_err(ErrorKind::Parse, "Failed to parse certificate"))
    }

    pub fn pkey(&self) -> Result<PKey<Private>> {
        PKey::private_key_from_pem(self.keys.pkey.as_bytes())
            .map_err(openssl_err(ErrorKind::Parse, "Failed to parse private key"))
    }

    /// Parsed certificate fields, computed once
    pub fn data(&self) -> Result<&CertificateData> {
        self.data.get_or_try_init(|| {
            debug!("Parsing certificate fields");
            CertificateData::parse(&self.keys.cert)
        })
    }

    /// The signer's ID with leading zeros removed
    ///
    /// The first strategy that finds a value wins, even when stripping leaves
    /// it empty (a subject serialNumber of `"000"` yields `""`).
    ///
    /// # Errors
    /// `ErrorKind::IdNotFound` when no strategy in [`ID_STRATEGIES`] yields a value.
    pub fn id(&self, force_upper: bool) -> Result<String> {
        let (_, id) = self.find_id()?;
        Ok(if force_upper { id.to_uppercase() } else { id })
    }

    /// Which strategy produced [`Certificate::id`]
    pub fn id_source(&self) -> Result<IdSource> {
        self.find_id().map(|(source, _)| source)
    }

    fn find_id(&self) -> Result<(IdSource, String)> {
        let data = self.data()?;
        ID_STRATEGIES
            .iter()
            .find_map(|source| source.extract(data).map(|id| (*source, id)))
            .ok_or_else(|| CertificateError::new(ErrorKind::IdNotFound, "ID not found"))
    }

    /// Subject common name
    pub fn name(&self) -> Result<String> {
        let data = self.data()?;
        required_attribute(&data.subject, DnAttribute::CommonName, "subject")
    }

    /// Subject email address
    pub fn email(&self) -> Result<String> {
        let data = self.data()?;
        required_attribute(&data.subject, DnAttribute::EmailAddress, "subject")
    }

    /// Issuer common name
    pub fn issuer(&self) -> Result<String> {
        let data = self.data()?;
        required_attribute(&data.issuer, DnAttribute::CommonName, "issuer")
    }

    pub fn serial_number(&self) -> Result<String> {
        Ok(self.data()?.serial_number.clone())
    }

    pub fn validity(&self) -> Result<ValidityWindow> {
        Ok(self.data()?.validity)
    }

    /// Start of validity as `YYYY-MM-DDTHH:MM:SS` local time
    pub fn valid_from(&self) -> Result<String> {
        Ok(format_local(self.validity()?.not_before))
    }

    /// End of validity as `YYYY-MM-DDTHH:MM:SS` local time
    pub fn valid_to(&self) -> Result<String> {
        Ok(format_local(self.validity()?.not_after))
    }

    /// Whole days between the start and the end of validity
    pub fn total_days(&self) -> Result<i64> {
        let validity = self.validity()?;
        Ok((validity.not_after - validity.not_before).num_days())
    }

    /// Whole days from `from` (default: now) until the end of validity
    ///
    /// Negative once the certificate has expired. Use [`Certificate::is_active`]
    /// to decide expiration.
    pub fn expiration_days(&self, from: Option<DateTime<Local>>) -> Result<i64> {
        let from = from.unwrap_or_else(Local::now).with_timezone(&Utc);
        Ok((self.validity()?.not_after - from).num_days())
    }

    /// Whether the certificate is valid at any time today
    pub fn is_active(&self) -> Result<bool> {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        self.is_active_at(&today)
    }

    /// Whether `when` falls inside the validity window
    ///
    /// `when` is `YYYY-MM-DD` (read as the end of that day) or
    /// `YYYY-MM-DDTHH:MM:SS`; a space may replace the `T`.
    pub fn is_active_at(&self, when: &str) -> Result<bool> {
        let when = fixed_width_moment(when)?;
        let from = self.valid_from()?;
        let to = self.valid_to()?;
        Ok(from.as_str() <= when.as_str() && when.as_str() <= to.as_str())
    }

    /// RSA modulus, base64 encoded and wrapped at `wrap_width` columns
    pub fn modulus(&self, wrap_width: usize) -> Result<String> {
        let params = self.rsa_parameters()?;
        Ok(encode_wrapped(&params.modulus, wrap_width))
    }

    /// RSA public exponent, base64 encoded and wrapped at `wrap_width` columns
    pub fn exponent(&self, wrap_width: usize) -> Result<String> {
        let params = self.rsa_parameters()?;
        Ok(encode_wrapped(&params.exponent, wrap_width))
    }

    fn rsa_parameters(&self) -> Result<&RsaParameters> {
        self.rsa.get_or_try_init(|| {
            debug!("Reading RSA parameters from private key");
            let rsa = self.pkey()?.rsa().map_err(openssl_err(
                ErrorKind::UnsupportedKey,
                "Private key is not an RSA key",
            ))?;
            let params = RsaParameters {
                modulus: rsa.n().to_vec(),
                exponent: rsa.e().to_vec(),
            };
            if params.modulus.is_empty() || params.exponent.is_empty() {
                return Err(CertificateError::new(
                    ErrorKind::UnsupportedKey,
                    "RSA key parameters are unavailable",
                ));
            }
            Ok(params)
        })
    }

    /// Package certificate and key into a password-protected PKCS#12 container
    pub fn pkcs12(&self, password: &str) -> Result<Vec<u8>> {
        let x509 = self.x509()?;
        let pkey = self.pkey()?;
        let friendly_name = self.name().unwrap_or_else(|_| "certificate".to_string());

        let mut builder = Pkcs12::builder();
        builder.name(&friendly_name).pkey(&pkey).cert(&x509);
        let pkcs12 = builder.build2(password).map_err(openssl_err(
            ErrorKind::Container,
            "Failed to build PKCS#12 container",
        ))?;
        pkcs12.to_der().map_err(openssl_err(
            ErrorKind::Container,
            "Failed to encode PKCS#12 container",
        ))
    }

    /// Run a validation policy against this certificate
    pub fn validate_with(&self, validator: &dyn CertificateValidator) -> Result<()> {
        validator.validate(self)
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("cert", &self.keys.cert)
            .field("pkey", &"<redacted>")
            .field("parsed", &self.data.get().is_some())
            .finish()
    }
}

fn required_attribute(dn: &DistinguishedName, attr: DnAttribute, side: &str) -> Result<String> {
    match dn.get(attr).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CertificateError::new(
            ErrorKind::MissingField,
            format!("Attribute {} not found in certificate {}", attr, side),
        )),
    }
}

fn format_local(moment: DateTime<Utc>) -> String {
    moment
        .with_timezone(&Local)
        .format(DATE_TIME_FORMAT)
        .to_string()
}

fn fixed_width_moment(when: &str) -> Result<String> {
    let when = when.trim();
    if let Ok(date) = NaiveDate::parse_from_str(when, "%Y-%m-%d") {
        return Ok(format!("{}{}", date.format("%Y-%m-%d"), END_OF_DAY));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(when, layout).ok())
        .map(|moment| moment.format(DATE_TIME_FORMAT).to_string())
        .ok_or_else(|| {
            CertificateError::new(
                ErrorKind::InvalidInput,
                format!("Unrecognized date '{}'", when),
            )
        })
}

fn encode_wrapped(bytes: &[u8], wrap_width: usize) -> String {
    wrap_pem_body(&STANDARD.encode(bytes), wrap_width)
        .trim_end()
        .to_string()
}
