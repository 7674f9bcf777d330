//! Request model consumed from the HTTP front-end
//!
//! The front-end forwards the caller's form fields verbatim; this crate
//! normalizes them into values the query engine accepts. Certificate
//! material stays base64-encoded here and is only decoded by the engine's
//! certificate store, immediately before use.

use chrono::NaiveDate;
use serde::Deserialize;

/// Raw query request as received from the front-end.
///
/// `certificado_base64` and `senha_certificado` are sensitive: the struct
/// deliberately does not derive `Debug` or `Serialize` so neither can end
/// up in logs or response bodies.
#[derive(Clone, Deserialize)]
pub struct ConsultaRequest {
    /// Recipient company CNPJ, punctuation allowed
    pub cnpj_empresa: String,
    /// Period start, YYYY-MM-DD
    pub data_inicio: String,
    /// Period end, YYYY-MM-DD
    pub data_fim: String,
    /// PKCS#12 bundle, base64-encoded
    pub certificado_base64: String,
    /// PKCS#12 passphrase
    pub senha_certificado: String,
    /// Jurisdiction code ("SP", "RS", ..., or "AN")
    #[serde(default = "default_estado")]
    pub estado: String,
}

fn default_estado() -> String {
    "AN".to_string()
}

/// Validated, inclusive issue-date window for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodo {
    pub inicio: NaiveDate,
    pub fim: NaiveDate,
}

impl Periodo {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.inicio <= date && date <= self.fim
    }
}
