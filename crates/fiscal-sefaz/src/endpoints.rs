//! Jurisdiction codes and SEFAZ endpoint resolution
//!
//! The distribution service is federated: a few states run their own
//! regional deployment, everyone is also served by the national environment
//! (Ambiente Nacional). Resolution is a static table and cannot fail: the
//! national endpoint is always appended last, so every jurisdiction yields
//! at least one candidate.

const NATIONAL_URL: &str =
    "https://www1.nfe.fazenda.gov.br/NFeDistribuicaoDFe/NFeDistribuicaoDFe.asmx";
const SP_URL: &str = "https://nfe.fazenda.sp.gov.br/ws/NFeDistribuicaoDFe/NFeDistribuicaoDFe.asmx";
const RS_URL: &str = "https://nfe.sefazrs.rs.gov.br/ws/NfeDistribuicaoDFe/NfeDistribuicaoDFe.asmx";

/// Jurisdiction code: one of the 27 federative units, or the national
/// environment `An` used both as an explicit choice and as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uf {
    Ac, Al, Ap, Am, Ba, Ce, Df, Es, Go, Ma, Mt, Ms, Mg, Pa, Pb, Pr, Pe, Pi,
    Rj, Rn, Rs, Ro, Rr, Sc, Sp, Se, To,
    /// Ambiente Nacional
    An,
}

impl Uf {
    pub fn from_code(code: &str) -> Option<Uf> {
        let uf = match code.trim().to_ascii_uppercase().as_str() {
            "AC" => Self::Ac, "AL" => Self::Al, "AP" => Self::Ap, "AM" => Self::Am,
            "BA" => Self::Ba, "CE" => Self::Ce, "DF" => Self::Df, "ES" => Self::Es,
            "GO" => Self::Go, "MA" => Self::Ma, "MT" => Self::Mt, "MS" => Self::Ms,
            "MG" => Self::Mg, "PA" => Self::Pa, "PB" => Self::Pb, "PR" => Self::Pr,
            "PE" => Self::Pe, "PI" => Self::Pi, "RJ" => Self::Rj, "RN" => Self::Rn,
            "RS" => Self::Rs, "RO" => Self::Ro, "RR" => Self::Rr, "SC" => Self::Sc,
            "SP" => Self::Sp, "SE" => Self::Se, "TO" => Self::To, "AN" => Self::An,
            _ => return None,
        };
        Some(uf)
    }

    /// IBGE code used as `cUFAutor` in the request envelope. The national
    /// environment uses the reserved code 91.
    pub fn ibge_code(&self) -> u8 {
        match self {
            Self::Ro => 11, Self::Ac => 12, Self::Am => 13, Self::Rr => 14,
            Self::Pa => 15, Self::Ap => 16, Self::To => 17, Self::Ma => 21,
            Self::Pi => 22, Self::Ce => 23, Self::Rn => 24, Self::Pb => 25,
            Self::Pe => 26, Self::Al => 27, Self::Se => 28, Self::Ba => 29,
            Self::Mg => 31, Self::Es => 32, Self::Rj => 33, Self::Sp => 35,
            Self::Pr => 41, Self::Sc => 42, Self::Rs => 43, Self::Ms => 50,
            Self::Mt => 51, Self::Go => 52, Self::Df => 53, Self::An => 91,
        }
    }
}

/// How a request must be framed for a given deployment. Content type and
/// SOAP action header are fixed per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProfile {
    /// SOAP 1.2: application/soap+xml plus an explicit SOAPAction header
    Soap12,
    /// SOAP 1.1 as still served by older regional stacks: text/xml
    Soap11,
}

impl TransportProfile {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Soap12 => "application/soap+xml; charset=utf-8",
            Self::Soap11 => "text/xml; charset=utf-8",
        }
    }

    pub fn soap_action(&self) -> &'static str {
        "http://www.portalfiscal.inf.br/nfe/wsdl/NFeDistribuicaoDFe/nfeDistDFeInteresse"
    }
}

/// One candidate service deployment. Statically derived from the
/// jurisdiction; immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub profile: TransportProfile,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, profile: TransportProfile) -> Endpoint {
        Endpoint {
            url: url.into(),
            profile,
        }
    }

    pub fn national() -> Endpoint {
        Endpoint::new(NATIONAL_URL, TransportProfile::Soap12)
    }
}

/// Resolves the candidate endpoints for a jurisdiction, in priority order:
/// the regional deployment when the state runs one, then the national
/// fallback. Never empty.
pub fn resolve(uf: Uf) -> Vec<Endpoint> {
    let mut endpoints = Vec::with_capacity(2);

    match uf {
        Uf::Sp => endpoints.push(Endpoint::new(SP_URL, TransportProfile::Soap12)),
        Uf::Rs => endpoints.push(Endpoint::new(RS_URL, TransportProfile::Soap11)),
        _ => {}
    }

    endpoints.push(Endpoint::national());
    endpoints
}
