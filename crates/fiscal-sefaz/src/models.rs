//! Data types produced by the distribution query

use chrono::{DateTime, Utc};
use serde::Serialize;

/// NSU sequence cursor. Monotonically increasing marker identifying the
/// last document already seen; the service returns documents after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Nsu(pub u64);

impl Nsu {
    pub const ZERO: Nsu = Nsu(0);

    /// Wire form: zero-padded to 15 digits.
    pub fn formatted(&self) -> String {
        format!("{:015}", self.0)
    }

    pub fn parse(value: &str) -> Option<Nsu> {
        value.trim().parse::<u64>().ok().map(Nsu)
    }
}

impl std::fmt::Display for Nsu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Environment the query runs against. The distribution service segregates
/// production and homologation document stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TpAmb {
    #[default]
    Producao,
    Homologacao,
}

impl TpAmb {
    pub fn code(&self) -> u8 {
        match self {
            Self::Producao => 1,
            Self::Homologacao => 2,
        }
    }
}

/// One electronic invoice as seen by the recipient. Immutable once parsed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotaFiscal {
    /// 44-digit access key (chave de acesso)
    pub chave: String,
    /// NSU under which the distribution service delivered this document
    pub nsu: String,
    pub data_emissao: DateTime<Utc>,
    #[serde(rename = "fornecedorCNPJ")]
    pub fornecedor_cnpj: String,
    pub fornecedor_nome: String,
    pub valor_total: f64,
    /// Decompressed document XML as delivered (resNFe summary or nfeProc)
    pub xml_content: String,
}

impl NotaFiscal {
    /// Key used for cross-page deduplication: the access key when the
    /// document carries one, the NSU otherwise.
    pub fn dedup_key(&self) -> &str {
        if self.chave.is_empty() {
            &self.nsu
        } else {
            &self.chave
        }
    }
}

/// Protocol status vocabulary of one distribution response. Closed enum so
/// every handler is forced through an exhaustive match; codes outside the
/// vocabulary land in `Unknown` and are surfaced, never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DfeStatus {
    /// Documents returned and more remain after ultNSU
    OkHasMore,
    /// Documents returned and the stream is exhausted
    OkComplete,
    /// cStat 137: nothing for this recipient
    NoData,
    /// Client certificate rejected (cStat 280..=299)
    AuthenticationRejected,
    /// cStat 656 (consumo indevido): back off and retry
    Throttled,
    /// Request rejected as malformed (cStat 215/225)
    MalformedRequest,
    /// Any cStat outside the known vocabulary
    Unknown(u16),
}

impl DfeStatus {
    /// Maps a cStat to the vocabulary. 138 means documents were found; the
    /// has-more / complete split comes from comparing ultNSU with maxNSU.
    pub fn from_c_stat(c_stat: u16, ult_nsu: Nsu, max_nsu: Nsu) -> DfeStatus {
        match c_stat {
            137 => Self::NoData,
            138 => {
                if ult_nsu < max_nsu {
                    Self::OkHasMore
                } else {
                    Self::OkComplete
                }
            }
            656 => Self::Throttled,
            280..=299 => Self::AuthenticationRejected,
            215 | 225 => Self::MalformedRequest,
            other => Self::Unknown(other),
        }
    }
}

/// One parsed distribution response.
#[derive(Debug)]
pub struct ParsedBatch {
    pub status: DfeStatus,
    pub c_stat: u16,
    pub x_motivo: String,
    pub ult_nsu: Nsu,
    pub max_nsu: Nsu,
    pub notas: Vec<NotaFiscal>,
    /// Documents that failed record extraction in this batch
    pub skipped: usize,
}

/// Aggregated result of one whole query: ordered, deduplicated, and
/// date-filtered records plus the protocol state at completion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultaResult {
    pub notas: Vec<NotaFiscal>,
    /// Protocol state at completion (`OkComplete`, or `NoData` when the
    /// service had nothing for this recipient)
    pub status: DfeStatus,
    /// Documents delivered by the service before window filtering and dedup
    pub total_consultado: usize,
    /// Malformed documents skipped during record extraction
    pub total_ignoradas: usize,
    /// Cursor position when the service signalled completion
    #[serde(serialize_with = "serialize_nsu")]
    pub ultimo_nsu: Nsu,
}

fn serialize_nsu<S: serde::Serializer>(nsu: &Nsu, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(nsu.0)
}
