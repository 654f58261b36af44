//! Certificate validation policies
//!
//! A policy is anything implementing [`CertificateValidator`]. The crate ships
//! [`RunCertificateValidator`], the rule set used for Chilean electronic
//! signatures, where the certificate ID is a RUN (`<number>-<check digit>`).

use crate::certificate::Certificate;
use crate::error::{CertificateError, ErrorKind, Result};
use tracing::warn;

/// A certificate acceptance policy
pub trait CertificateValidator {
    /// `Ok(())` when the certificate satisfies the policy
    fn validate(&self, certificate: &Certificate) -> Result<()>;
}

/// Default policy for RUN-identified certificates
///
/// Rules, checked in order:
/// 1. the ID has a `-` between number and check digit;
/// 2. a `K` check digit is stored upper case;
/// 3. the certificate is active today.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCertificateValidator;

impl RunCertificateValidator {
    pub fn new() -> Self {
        Self
    }
}

impl CertificateValidator for RunCertificateValidator {
    fn validate(&self, certificate: &Certificate) -> Result<()> {
        let id = certificate.id(false)?;

        let Some((_, check_digit)) = id.rsplit_once('-') else {
            warn!(id = %id, "Certificate ID has no check digit separator");
            return Err(CertificateError::new(
                ErrorKind::Validation,
                format!(
                    "Certificate ID {} has no dash between number and check digit",
                    id
                ),
            ));
        };

        if check_digit == "k" {
            let issuer = certificate.issuer()?;
            warn!(id = %id, issuer = %issuer, "Certificate ID has a lower case check digit");
            return Err(CertificateError::new(
                ErrorKind::Validation,
                format!(
                    "Certificate ID {} has a lower case K check digit, issued by {}",
                    id, issuer
                ),
            ));
        }

        if !certificate.is_active()? {
            let to = certificate.valid_to()?;
            warn!(id = %id, expired = %to, "Certificate is not active");
            return Err(CertificateError::new(
                ErrorKind::Validation,
                format!("Certificate is not active, valid until {}", to),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distinguished_name::{DistinguishedName, DnAttribute};
    use crate::generate_self_signed_chain::SelfSignedChainBuilder;

    fn certificate(serial: &str) -> Certificate {
        SelfSignedChainBuilder::new()
            .subject(DistinguishedName::new().with(DnAttribute::SerialNumber, serial))
            .to_certificate()
            .unwrap()
    }

    #[test]
    fn test_valid_certificate_passes() {
        assert!(RunCertificateValidator::new()
            .validate(&certificate("11222333-9"))
            .is_ok());
        assert!(RunCertificateValidator::new()
            .validate(&certificate("10-K"))
            .is_ok());
    }

    #[test]
    fn test_missing_separator_fails() {
        let err = RunCertificateValidator::new()
            .validate(&certificate("123"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("123"));
    }

    #[test]
    fn test_lower_case_k_fails_naming_issuer() {
        let cert = certificate("10-k");
        let err = RunCertificateValidator::new().validate(&cert).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("Daniel Certificate Authority"));
    }

    #[test]
    fn test_inactive_certificate_fails() {
        // zero days of validity ends before the end of today
        let cert = SelfSignedChainBuilder::new()
            .validity_days(0)
            .to_certificate()
            .unwrap();
        let err = RunCertificateValidator::new().validate(&cert).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains(&cert.valid_to().unwrap()));
    }

    #[test]
    fn test_custom_policy_through_trait_object() {
        struct RejectAll;
        impl CertificateValidator for RejectAll {
            fn validate(&self, _: &Certificate) -> Result<()> {
                Err(CertificateError::new(ErrorKind::Validation, "rejected"))
            }
        }

        let cert = certificate("11222333-9");
        let policies: [&dyn CertificateValidator; 2] = [&RunCertificateValidator, &RejectAll];
        assert!(cert.validate_with(policies[0]).is_ok());
        assert_eq!(cert.validate_with(policies[1]).unwrap_err().message(), "rejected");
    }
}
