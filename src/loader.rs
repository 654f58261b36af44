//! Entry points for building a [`Certificate`]
//!
//! Every constructor funnels into [`CertificateLoader::from_key_pair`]:
//! `file -> container bytes -> key map -> key pair`.

use crate::certificate::{Certificate, KeyPair};
use crate::error::{openssl_err, CertificateError, ErrorKind, Result};
use openssl::pkcs12::Pkcs12;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const PUBLIC_KEY_ALIASES: [&str; 2] = ["publicKey", "cert"];
const PRIVATE_KEY_ALIASES: [&str; 2] = ["privateKey", "pkey"];

/// Unpack a PKCS#12 container into PEM certificate and PKCS#8 private key
pub fn unpack_container(data: &[u8], password: &str) -> Result<KeyPair> {
    let parsed = Pkcs12::from_der(data)
        .and_then(|pkcs12| pkcs12.parse2(password))
        .map_err(openssl_err(
            ErrorKind::Container,
            "Failed to read PKCS#12 container, check the password and the file contents",
        ))?;

    let (Some(cert), Some(pkey)) = (parsed.cert, parsed.pkey) else {
        return Err(CertificateError::new(
            ErrorKind::Container,
            "PKCS#12 container does not hold both a certificate and a private key",
        ));
    };

    let cert = cert
        .to_pem()
        .map_err(openssl_err(ErrorKind::Container, "Failed to export certificate"))?;
    let pkey = pkey
        .private_key_to_pem_pkcs8()
        .map_err(openssl_err(ErrorKind::Container, "Failed to export private key"))?;

    Ok(KeyPair {
        cert: pem_to_string(cert)?,
        pkey: pem_to_string(pkey)?,
    })
}

fn pem_to_string(pem: Vec<u8>) -> Result<String> {
    String::from_utf8(pem).map_err(|e| {
        CertificateError::new(ErrorKind::Container, "Exported PEM is not UTF-8").with_source(e)
    })
}

/// Façade over the supported certificate sources
pub struct CertificateLoader;

impl CertificateLoader {
    /// Load a PKCS#12 file (`.p12` / `.pfx`)
    pub fn from_file<P: AsRef<Path>>(path: P, password: &str) -> Result<Certificate> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            CertificateError::new(
                ErrorKind::Io,
                format!("Failed to read certificate file {}", path.display()),
            )
            .with_source(e)
        })?;
        debug!(path = %path.display(), bytes = data.len(), "Read certificate container");
        Self::from_container_data(&data, password)
    }

    /// Load raw PKCS#12 bytes
    pub fn from_container_data(data: &[u8], password: &str) -> Result<Certificate> {
        let keys = unpack_container(data, password)?;
        Ok(Self::from_key_pair(&keys.cert, &keys.pkey))
    }

    /// Load from a map holding `publicKey`/`cert` and `privateKey`/`pkey`
    pub fn from_key_map(map: &HashMap<String, String>) -> Result<Certificate> {
        let public_key = lookup(map, &PUBLIC_KEY_ALIASES)?;
        let private_key = lookup(map, &PRIVATE_KEY_ALIASES)?;
        Ok(Self::from_key_pair(public_key, private_key))
    }

    /// Wrap a PEM (or bare base64) certificate and private key
    pub fn from_key_pair(public_key: &str, private_key: &str) -> Certificate {
        Certificate::new(public_key, private_key)
    }
}

fn lookup<'a>(map: &'a HashMap<String, String>, aliases: &[&str]) -> Result<&'a str> {
    aliases
        .iter()
        .find_map(|key| map.get(*key))
        .map(String::as_str)
        .ok_or_else(|| {
            CertificateError::new(
                ErrorKind::MissingField,
                format!("Key map has no {} entry", aliases.join("/")),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distinguished_name::{DistinguishedName, DnAttribute};
    use crate::generate_self_signed_chain::SelfSignedChainBuilder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn builder() -> SelfSignedChainBuilder {
        SelfSignedChainBuilder::new().subject(
            DistinguishedName::new()
                .with(DnAttribute::CommonName, "Pedro Rojas")
                .with(DnAttribute::EmailAddress, "pedro.rojas@example.cl")
                .with(DnAttribute::SerialNumber, "11222333-9"),
        )
    }

    #[test]
    fn test_key_map_round_trip() {
        let map = builder().to_key_map().unwrap();
        let certificate = CertificateLoader::from_key_map(&map).unwrap();
        assert_eq!(certificate.id(true).unwrap(), "11222333-9");
        assert_eq!(certificate.name().unwrap(), "Pedro Rojas");
        assert_eq!(certificate.email().unwrap(), "pedro.rojas@example.cl");
    }

    #[test]
    fn test_key_map_accepts_long_names() {
        let map = builder().to_key_map().unwrap();
        let renamed = HashMap::from([
            ("publicKey".to_string(), map["cert"].clone()),
            ("privateKey".to_string(), map["pkey"].clone()),
        ]);
        let certificate = CertificateLoader::from_key_map(&renamed).unwrap();
        assert_eq!(certificate.name().unwrap(), "Pedro Rojas");
    }

    #[test]
    fn test_key_map_missing_entry() {
        let map = HashMap::from([("cert".to_string(), "abc".to_string())]);
        let err = CertificateLoader::from_key_map(&map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(err.message().contains("privateKey/pkey"));

        let map = HashMap::from([("pkey".to_string(), "abc".to_string())]);
        let err = CertificateLoader::from_key_map(&map).unwrap_err();
        assert!(err.message().contains("publicKey/cert"));
    }

    #[test]
    fn test_from_file() {
        let builder = builder().password("file secret");
        let container = builder.to_pkcs12().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&container).unwrap();

        let certificate = CertificateLoader::from_file(file.path(), "file secret").unwrap();
        assert_eq!(certificate.id(true).unwrap(), "11222333-9");
    }

    #[test]
    fn test_from_file_missing_path() {
        let err = CertificateLoader::from_file("/nonexistent/certificate.p12", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.codes().is_empty());
    }

    #[test]
    fn test_wrong_password() {
        let container = builder().to_pkcs12().unwrap();
        let err = CertificateLoader::from_container_data(&container, "wrong").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Container);
        assert!(!err.codes().is_empty());
        assert!(err
            .to_string()
            .contains("(wrong password or corrupted PKCS#12 container)"));
    }

    #[test]
    fn test_corrupt_container() {
        let err = CertificateLoader::from_container_data(b"not a container", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Container);
    }
}
