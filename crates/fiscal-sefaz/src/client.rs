//! mTLS SOAP transport
//!
//! One send is one scoped session: the HTTP client (and with it the TLS
//! connection) is built for the call and dropped on every exit path. Retry
//! and fallback policy live in the service layer, never here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::certificate::CertificateBundle;
use crate::endpoints::Endpoint;
use crate::errors::{TransportError, TransportReason};

/// Raw service response: HTTP status plus the unparsed body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Seam between the orchestrator and the wire. The production
/// implementation is [`SefazClient`]; tests script their own.
#[async_trait]
pub trait SefazTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &Endpoint,
        bundle: &CertificateBundle,
        envelope: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// Production transport over reqwest with the bundle as client identity.
#[derive(Debug, Default)]
pub struct SefazClient;

impl SefazClient {
    pub fn new() -> SefazClient {
        SefazClient
    }

    fn classify(endpoint: &Endpoint, error: reqwest::Error) -> TransportError {
        let reason = if error.is_timeout() {
            TransportReason::Timeout
        } else if error.is_connect() {
            TransportReason::ConnectionFailed(error.to_string())
        } else {
            TransportReason::Io(error.to_string())
        };
        TransportError {
            endpoint: endpoint.url.clone(),
            reason,
        }
    }
}

#[async_trait]
impl SefazTransport for SefazClient {
    async fn send(
        &self,
        endpoint: &Endpoint,
        bundle: &CertificateBundle,
        envelope: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let client = reqwest::Client::builder()
            .identity(bundle.identity())
            .build()
            .map_err(|e| TransportError {
                endpoint: endpoint.url.clone(),
                reason: TransportReason::Tls(e.to_string()),
            })?;

        debug!(url = %endpoint.url, "sending distribution request");

        let response = client
            .post(&endpoint.url)
            .header(CONTENT_TYPE, endpoint.profile.content_type())
            .header("SOAPAction", endpoint.profile.soap_action())
            .timeout(timeout)
            .body(envelope.to_string())
            .send()
            .await
            .map_err(|e| Self::classify(endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Self::classify(endpoint, e))?;

        debug!(url = %endpoint.url, status, bytes = body.len(), "distribution response received");

        Ok(RawResponse { status, body })
    }
}
