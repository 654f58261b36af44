//! TOML configuration for generated certificate fixtures
//!
//! ```toml
//! validity_days = 730
//! password = "fixture"
//!
//! [subject]
//! common_name = "Juan Perez"
//! email_address = "juan.perez@example.cl"
//! serial_number = "11222333-9"
//!
//! [issuer]
//! common_name = "Test CA"
//! ```
//!
//! Every DN attribute left out keeps the generator default.

use crate::distinguished_name::{DistinguishedName, DnAttribute};
use crate::error::{CertificateError, ErrorKind, Result};
use crate::generate_self_signed_chain::{
    PASSWORD_DEFAULT, RSA_KEY_SIZE_DEFAULT, VALIDITY_DAYS_DEFAULT,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct FixtureConfig {
    #[serde(default)]
    pub subject: NameConfig,
    #[serde(default)]
    pub issuer: NameConfig,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_key_size")]
    pub key_size: u32,
    #[serde(default)]
    pub id_in_subject_alt_name: bool,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            subject: NameConfig::default(),
            issuer: NameConfig::default(),
            validity_days: default_validity_days(),
            password: default_password(),
            key_size: default_key_size(),
            id_in_subject_alt_name: false,
        }
    }
}

fn default_validity_days() -> u32 {
    VALIDITY_DAYS_DEFAULT
}

fn default_password() -> String {
    PASSWORD_DEFAULT.to_string()
}

fn default_key_size() -> u32 {
    RSA_KEY_SIZE_DEFAULT
}

/// Distinguished name overrides; unset attributes keep their default
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct NameConfig {
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub common_name: Option<String>,
    pub email_address: Option<String>,
    pub serial_number: Option<String>,
    pub title: Option<String>,
}

impl NameConfig {
    /// Only the attributes present in the config
    pub fn to_distinguished_name(&self) -> DistinguishedName {
        let fields = [
            (DnAttribute::Country, &self.country),
            (DnAttribute::State, &self.state),
            (DnAttribute::Locality, &self.locality),
            (DnAttribute::Organization, &self.organization),
            (DnAttribute::OrganizationalUnit, &self.organizational_unit),
            (DnAttribute::CommonName, &self.common_name),
            (DnAttribute::EmailAddress, &self.email_address),
            (DnAttribute::SerialNumber, &self.serial_number),
            (DnAttribute::Title, &self.title),
        ];
        fields
            .into_iter()
            .filter_map(|(attr, value)| value.as_ref().map(|v| (attr, v)))
            .fold(DistinguishedName::new(), |dn, (attr, value)| {
                dn.with(attr, value.as_str())
            })
    }
}

impl FixtureConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|e| {
            CertificateError::new(
                ErrorKind::Config,
                format!("Failed to read config file: {}", path.display()),
            )
            .with_source(e)
        })?;
        Self::from_toml_str(&config_str)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            CertificateError::new(ErrorKind::Config, "Failed to parse config file").with_source(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_self_signed_chain::SelfSignedChainBuilder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
validity_days = 730
password = "fixture"

[subject]
common_name = "Juan Perez"
email_address = "juan.perez@example.cl"
serial_number = "10-K"

[issuer]
common_name = "Test CA"
"#;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FixtureConfig::from_toml_str("").unwrap();
        assert_eq!(config.validity_days, 365);
        assert_eq!(config.password, PASSWORD_DEFAULT);
        assert_eq!(config.key_size, 2048);
        assert!(config.subject.to_distinguished_name().is_empty());
    }

    #[test]
    fn test_partial_names() {
        let config = FixtureConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.validity_days, 730);
        let subject = config.subject.to_distinguished_name();
        assert_eq!(subject.get(DnAttribute::SerialNumber), Some("10-K"));
        assert_eq!(subject.get(DnAttribute::Country), None);
    }

    #[test]
    fn test_unknown_name_field_is_rejected() {
        let err = FixtureConfig::from_toml_str("[subject]\nnickname = \"x\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_builder_from_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = FixtureConfig::from_file(file.path()).unwrap();

        let builder = SelfSignedChainBuilder::from_config(&config);
        assert_eq!(builder.password_value(), "fixture");
        assert_eq!(builder.issuer_name().get(DnAttribute::CommonName), Some("Test CA"));
        // defaults survive where the file is silent
        assert_eq!(builder.subject_name().get(DnAttribute::Country), Some("CL"));

        let certificate = builder.to_certificate().unwrap();
        assert_eq!(certificate.id(true).unwrap(), "10-K");
        assert_eq!(certificate.total_days().unwrap(), 730);
    }

    #[test]
    fn test_missing_config_file() {
        let err = FixtureConfig::from_file("/nonexistent/fixtures.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
