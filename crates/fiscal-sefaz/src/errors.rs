//! SEFAZ query error taxonomy
//!
//! Four layers, matching how failures propagate: certificate problems and
//! caller-input problems are terminal; transport problems are recoverable
//! via endpoint fallback; per-record problems are absorbed and counted.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use fiscal_core::ValidationError;

/// Certificate bundle failures. Always terminal: the caller must supply a
/// usable PKCS#12 bundle before any network call is attempted.
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Certificate is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Certificate is not a valid PKCS#12 bundle: {0}")]
    InvalidBundle(String),

    #[error("Certificate passphrase is incorrect")]
    WrongPassphrase,

    #[error("PKCS#12 bundle contains no certificate")]
    MissingCertificate,

    #[error("Certificate expired at {not_after}")]
    Expired { not_after: DateTime<Utc> },

    #[error("Failed to build TLS client identity: {0}")]
    Identity(String),
}

/// Why a single endpoint could not be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportReason {
    ConnectionFailed(String),
    Timeout,
    Tls(String),
    Io(String),
}

impl std::fmt::Display for TransportReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(e) => write!(f, "connection failed: {e}"),
            Self::Timeout => write!(f, "timed out"),
            Self::Tls(e) => write!(f, "TLS handshake failed: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

/// Per-endpoint network failure, tagged with the endpoint that failed.
/// Never retried by the client itself; the orchestrator decides whether to
/// fall through to the next endpoint.
#[derive(Error, Debug, Clone)]
#[error("Transport error against {endpoint}: {reason}")]
pub struct TransportError {
    pub endpoint: String,
    pub reason: TransportReason,
}

/// Batch-level response failures. A malformed individual record is not a
/// `ParseError`; it is absorbed by the parser and surfaced as a skip count.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Malformed SOAP response: {0}")]
    MalformedXml(String),

    #[error("Response is missing mandatory field {0}")]
    MissingField(&'static str),
}

/// Failure to extract one invoice record from a `docZip` document.
/// Recovered locally: the batch keeps its remaining records.
#[derive(Error, Debug)]
#[error("Failed to parse document NSU {nsu}: {reason}")]
pub struct RecordParseError {
    pub nsu: String,
    pub reason: String,
}

/// Terminal, caller-facing errors for one whole query.
#[derive(Error, Debug)]
pub enum ConsultaError {
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("SEFAZ rejected the client certificate at {endpoint} (cStat {c_stat}: {motivo})")]
    AuthenticationRejected {
        endpoint: String,
        c_stat: u16,
        motivo: String,
    },

    #[error("SEFAZ rejected the request as malformed at {endpoint} (cStat {c_stat}: {motivo})")]
    MalformedRequest {
        endpoint: String,
        c_stat: u16,
        motivo: String,
    },

    #[error("All endpoints failed ({}); last error: {last_error}", attempted.join(", "))]
    EndpointsExhausted {
        attempted: Vec<String>,
        last_error: String,
    },

    #[error("Query deadline of {deadline_secs}s exceeded")]
    DeadlineExceeded { deadline_secs: u64 },
}
