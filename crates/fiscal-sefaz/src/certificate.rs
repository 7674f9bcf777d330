//! PKCS#12 certificate bundle loading
//!
//! The caller ships the bundle base64-encoded alongside its passphrase; it
//! is decoded in memory, checked for validity, and turned into a TLS client
//! identity. Nothing touches disk, nothing survives the query, and neither
//! the passphrase nor key material is ever logged or printed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use openssl::pkcs12::Pkcs12;
use tracing::debug;
use x509_parser::prelude::*;

use crate::errors::CertificateError;

/// Opaque handle over the decoded bundle: the TLS client identity plus the
/// validity metadata needed before any network call. Not serializable by
/// design; `Debug` is redacted.
#[derive(Clone)]
pub struct CertificateBundle {
    identity: reqwest::Identity,
    not_after: DateTime<Utc>,
    subject: String,
}

impl CertificateBundle {
    pub fn identity(&self) -> reqwest::Identity {
        self.identity.clone()
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("subject", &self.subject)
            .field("not_after", &self.not_after)
            .field("identity", &"<redacted>")
            .finish()
    }
}

/// Loads PKCS#12 bundles into [`CertificateBundle`]s.
pub struct CertificateStore;

impl CertificateStore {
    /// Decodes and validates a base64-encoded PKCS#12 bundle. Fails fast
    /// with `CertificateError` on bad encoding, a malformed container, a
    /// wrong passphrase, or an expired certificate.
    pub fn load(
        certificado_base64: &str,
        senha: &str,
    ) -> Result<CertificateBundle, CertificateError> {
        // Bundles exported from browsers often arrive with line breaks
        let cleaned: String = certificado_base64
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        let der = BASE64
            .decode(cleaned.as_bytes())
            .map_err(|e| CertificateError::InvalidBase64(e.to_string()))?;

        let pkcs12 = Pkcs12::from_der(&der)
            .map_err(|e| CertificateError::InvalidBundle(e.to_string()))?;

        let parsed = pkcs12.parse2(senha).map_err(|stack| {
            let mac_failure = stack.errors().iter().any(|e| {
                e.reason()
                    .map(|r| r.contains("mac verify"))
                    .unwrap_or(false)
            });
            if mac_failure {
                CertificateError::WrongPassphrase
            } else {
                CertificateError::InvalidBundle(stack.to_string())
            }
        })?;

        let cert = parsed.cert.ok_or(CertificateError::MissingCertificate)?;
        let cert_der = cert
            .to_der()
            .map_err(|e| CertificateError::InvalidBundle(e.to_string()))?;

        let (_, x509) = X509Certificate::from_der(&cert_der)
            .map_err(|e| CertificateError::InvalidBundle(e.to_string()))?;

        let not_after = DateTime::<Utc>::from_timestamp(x509.validity().not_after.timestamp(), 0)
            .ok_or(CertificateError::MissingCertificate)?;
        let subject = x509.subject().to_string();

        if not_after <= Utc::now() {
            return Err(CertificateError::Expired { not_after });
        }

        let identity = reqwest::Identity::from_pkcs12_der(&der, senha)
            .map_err(|e| CertificateError::Identity(e.to_string()))?;

        debug!(subject = %subject, %not_after, "certificate bundle loaded");

        Ok(CertificateBundle {
            identity,
            not_after,
            subject,
        })
    }
}
