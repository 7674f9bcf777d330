//! Client for the SEFAZ `NFeDistribuicaoDFe` document distribution service
//!
//! Queries the electronic invoices issued against a recipient CNPJ over the
//! authority's SOAP interface: mTLS with the caller's PKCS#12 certificate,
//! regional-then-national endpoint fallback, and NSU-cursor pagination with
//! gzip-compressed document payloads.
//!
//! [`service::ConsultaService`] is the entry point; the modules below it are
//! usable on their own (envelope construction, response parsing, bundle
//! loading) for callers that drive the protocol themselves.

pub mod certificate;
pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod errors;
pub mod models;
pub mod parser;
pub mod service;

#[cfg(test)]
mod testsupport;

pub use certificate::{CertificateBundle, CertificateStore};
pub use client::{RawResponse, SefazClient, SefazTransport};
pub use endpoints::{resolve, Endpoint, TransportProfile, Uf};
pub use envelope::{EnvelopeBuilder, SoapOperation};
pub use errors::ConsultaError;
pub use models::{ConsultaResult, DfeStatus, NotaFiscal, Nsu, TpAmb};
pub use service::{ConsultaService, SefazConfig};
