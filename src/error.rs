//! Error type shared by every certificate operation.
//!
//! All failures surface as a single [`CertificateError`]. The [`ErrorKind`]
//! tells callers *what* went wrong so they can branch on it, the message is
//! meant for humans, and the optional list of OpenSSL error codes keeps the
//! low-level diagnostics. Codes that appear in [`KNOWN_OPENSSL_CODES`] are
//! rendered with a short description; anything else passes through verbatim.

use crate::generate_self_signed_chain::ChainStage;
use openssl::error::ErrorStack;
use std::fmt;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CertificateError>;

/// Packed OpenSSL error codes (as printed by `ERR_error_string`) with a short
/// human description.
pub const KNOWN_OPENSSL_CODES: &[(&str, &str)] = &[
    ("11800071", "wrong password or corrupted PKCS#12 container"),
    ("23076071", "wrong password or corrupted PKCS#12 container"),
    ("0480006C", "PEM data could not be read"),
    ("0906D06C", "PEM data could not be read"),
    ("0308010C", "unsupported cipher or algorithm"),
    ("1C800064", "bad decrypt, the password is probably wrong"),
    ("06065064", "bad decrypt, the password is probably wrong"),
    ("0680007B", "malformed ASN.1 data (header too long)"),
    ("068000A8", "malformed ASN.1 data (wrong tag)"),
];

/// Failure category of a [`CertificateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file could not be read
    Io,
    /// Certificate or key material could not be parsed
    Parse,
    /// A required attribute or map entry is absent or empty
    MissingField,
    /// Neither the subject serialNumber nor the SAN otherName carries an ID
    IdNotFound,
    /// The private key is not RSA or its parameters are unavailable
    UnsupportedKey,
    /// The requested capability is unavailable in the crypto backend
    Unsupported,
    /// PKCS#12 packing or unpacking failed
    Container,
    /// A stage of the self-signed chain pipeline failed
    Generation(ChainStage),
    /// Caller supplied malformed input
    InvalidInput,
    /// Fixture configuration could not be loaded
    Config,
    /// A validation policy rejected the certificate
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Io => write!(f, "io"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::MissingField => write!(f, "missing field"),
            ErrorKind::IdNotFound => write!(f, "id not found"),
            ErrorKind::UnsupportedKey => write!(f, "unsupported key"),
            ErrorKind::Unsupported => write!(f, "unsupported operation"),
            ErrorKind::Container => write!(f, "container"),
            ErrorKind::Generation(stage) => write!(f, "generation ({})", stage),
            ErrorKind::InvalidInput => write!(f, "invalid input"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Validation => write!(f, "validation"),
        }
    }
}

/// The crate's only error type
#[derive(Debug, thiserror::Error)]
#[error("{message}{}", describe_codes(.codes))]
pub struct CertificateError {
    kind: ErrorKind,
    message: String,
    codes: Vec<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CertificateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            codes: Vec::new(),
            source: None,
        }
    }

    /// Build an error carrying explicit low-level codes
    pub fn with_codes(kind: ErrorKind, message: impl Into<String>, codes: Vec<String>) -> Self {
        Self {
            codes,
            ..Self::new(kind, message)
        }
    }

    /// Build an error from an OpenSSL error stack, keeping every packed code
    pub fn from_openssl(kind: ErrorKind, message: impl Into<String>, stack: &ErrorStack) -> Self {
        let codes = stack
            .errors()
            .iter()
            .map(|e| format!("{:08X}", e.code()))
            .collect();
        Self::with_codes(kind, message, codes)
    }

    /// Attach an underlying error as the source
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw OpenSSL codes, as upper-case hex
    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

/// Description for a known OpenSSL code
pub fn describe_code(code: &str) -> Option<&'static str> {
    let code = code.trim_start_matches("error:");
    KNOWN_OPENSSL_CODES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, description)| *description)
}

fn describe_codes(codes: &[String]) -> String {
    if codes.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = codes
        .iter()
        .map(|code| match describe_code(code) {
            Some(description) => format!("{} ({})", code, description),
            None => code.clone(),
        })
        .collect();
    format!(": {}", rendered.join(", "))
}

/// Shorthand used with `map_err` on OpenSSL calls
pub(crate) fn openssl_err(
    kind: ErrorKind,
    message: impl Into<String>,
) -> impl FnOnce(ErrorStack) -> CertificateError {
    let message = message.into();
    move |stack| CertificateError::from_openssl(kind, message, &stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_codes() {
        let err = CertificateError::new(ErrorKind::IdNotFound, "ID not found");
        assert_eq!(err.to_string(), "ID not found");
        assert_eq!(err.kind(), ErrorKind::IdNotFound);
    }

    #[test]
    fn test_known_codes_are_translated() {
        let err = CertificateError::with_codes(
            ErrorKind::Container,
            "Failed to read PKCS#12 container",
            vec!["11800071".to_string(), "DEADBEEF".to_string()],
        );
        let rendered = err.to_string();
        assert!(rendered.contains("11800071 (wrong password or corrupted PKCS#12 container)"));
        assert!(rendered.ends_with(", DEADBEEF"));
    }

    #[test]
    fn test_describe_code_accepts_prefix() {
        assert_eq!(
            describe_code("error:0480006C"),
            Some("PEM data could not be read")
        );
        assert_eq!(describe_code("00000000"), None);
    }

    #[test]
    fn test_generation_kind_names_stage() {
        let kind = ErrorKind::Generation(ChainStage::SubjectCert);
        assert_eq!(kind.to_string(), "generation (subject-cert)");
    }
}
