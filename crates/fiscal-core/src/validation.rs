//! Caller-input validation
//!
//! CNPJ and date-range validation happens before any certificate is decoded
//! or any network call is made, so a malformed request fails fast.

use chrono::NaiveDate;

use crate::error::{ValidationError, ValidationResult};
use crate::types::Periodo;

/// Normalizes a CNPJ to its 14-digit form, accepting the punctuated
/// rendering (`00.000.000/0000-00`) the portal hands out.
pub fn validar_cnpj(cnpj: &str) -> ValidationResult<String> {
    let limpo: String = cnpj
        .chars()
        .filter(|c| !matches!(c, '.' | '/' | '-' | ' '))
        .collect();

    if limpo.len() != 14 || !limpo.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidCnpj(cnpj.to_string()));
    }

    Ok(limpo)
}

/// Parses and validates an inclusive `YYYY-MM-DD` date window.
pub fn validar_periodo(data_inicio: &str, data_fim: &str) -> ValidationResult<Periodo> {
    let inicio = parse_date(data_inicio)?;
    let fim = parse_date(data_fim)?;

    if inicio > fim {
        return Err(ValidationError::InvalidPeriod {
            start: data_inicio.to_string(),
            end: data_fim.to_string(),
        });
    }

    Ok(Periodo { inicio, fim })
}

fn parse_date(value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}
