//! SOAP envelope construction for the distribution service
//!
//! Pure string assembly against the `distDFeInt` 1.01 schema. Inputs are
//! validated here once more even though the service layer already ran
//! caller-input validation, so the builder is safe to use standalone.

use fiscal_core::{validar_cnpj, ValidationError};

use crate::endpoints::Uf;
use crate::models::{Nsu, TpAmb};

/// Which query the envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapOperation {
    /// Batch distribution from the last seen NSU (`distNSU`/`ultNSU`)
    #[default]
    DistNsu,
    /// A single specific NSU (`consNSU`/`NSU`)
    ConsNsu,
}

/// Builds `nfeDistDFeInteresse` envelopes for one jurisdiction and
/// environment. Construction is pure; the builder holds no session state.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeBuilder {
    uf: Uf,
    tp_amb: TpAmb,
}

impl EnvelopeBuilder {
    pub fn new(uf: Uf, tp_amb: TpAmb) -> EnvelopeBuilder {
        EnvelopeBuilder { uf, tp_amb }
    }

    /// Renders the envelope for `cnpj` at `cursor`. Fails with
    /// `ValidationError` when the CNPJ is not a 14-digit identifier.
    pub fn build(
        &self,
        cnpj: &str,
        cursor: Nsu,
        operation: SoapOperation,
    ) -> Result<String, ValidationError> {
        let cnpj = validar_cnpj(cnpj)?;

        let query = match operation {
            SoapOperation::DistNsu => format!(
                "<distNSU><ultNSU>{}</ultNSU></distNSU>",
                cursor.formatted()
            ),
            SoapOperation::ConsNsu => {
                format!("<consNSU><NSU>{}</NSU></consNSU>", cursor.formatted())
            }
        };

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
    <soap:Header/>
    <soap:Body>
        <nfeDistDFeInteresse xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeDistribuicaoDFe">
            <nfeDadosMsg>
                <distDFeInt xmlns="http://www.portalfiscal.inf.br/nfe" versao="1.01">
                    <tpAmb>{tp_amb}</tpAmb>
                    <cUFAutor>{c_uf}</cUFAutor>
                    <CNPJ>{cnpj}</CNPJ>
                    {query}
                </distDFeInt>
            </nfeDadosMsg>
        </nfeDistDFeInteresse>
    </soap:Body>
</soap:Envelope>"#,
            tp_amb = self.tp_amb.code(),
            c_uf = self.uf.ibge_code(),
            cnpj = cnpj,
            query = query,
        ))
    }
}
