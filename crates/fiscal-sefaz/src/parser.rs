//! Distribution response parsing
//!
//! The response is a SOAP envelope wrapping `retDistDFeInt`: a protocol
//! status (cStat/xMotivo), the cursor bounds (ultNSU/maxNSU), and zero or
//! more `docZip` documents, each base64-encoded gzip. Individual documents
//! that fail extraction are skipped and counted; they never abort the
//! batch. The parser holds no state: the same raw response always parses
//! to the same batch.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::client::RawResponse;
use crate::errors::{ParseError, RecordParseError};
use crate::models::{DfeStatus, NotaFiscal, Nsu, ParsedBatch};

/// Parses one raw distribution response into a [`ParsedBatch`].
pub fn parse(raw: &RawResponse) -> Result<ParsedBatch, ParseError> {
    if !(200..300).contains(&raw.status) {
        return Err(ParseError::UnexpectedStatus { status: raw.status });
    }

    let envelope = parse_envelope(&raw.body)?;

    let c_stat: u16 = envelope
        .c_stat
        .ok_or(ParseError::MissingField("cStat"))?
        .trim()
        .parse()
        .map_err(|_| ParseError::MalformedXml("cStat is not numeric".to_string()))?;

    if c_stat == 138 && envelope.ult_nsu.is_none() {
        return Err(ParseError::MissingField("ultNSU"));
    }

    let ult_nsu = envelope
        .ult_nsu
        .as_deref()
        .and_then(Nsu::parse)
        .unwrap_or(Nsu::ZERO);
    let max_nsu = envelope
        .max_nsu
        .as_deref()
        .and_then(Nsu::parse)
        .unwrap_or(ult_nsu);

    let mut notas = Vec::new();
    let mut skipped = 0usize;
    for doc in &envelope.docs {
        match decode_doc(doc) {
            Ok(nota) => notas.push(nota),
            Err(e) => {
                warn!(nsu = %e.nsu, reason = %e.reason, "skipping malformed document");
                skipped += 1;
            }
        }
    }

    Ok(ParsedBatch {
        status: DfeStatus::from_c_stat(c_stat, ult_nsu, max_nsu),
        c_stat,
        x_motivo: envelope.x_motivo.unwrap_or_default(),
        ult_nsu,
        max_nsu,
        notas,
        skipped,
    })
}

#[derive(Default)]
struct EnvelopeFields {
    c_stat: Option<String>,
    x_motivo: Option<String>,
    ult_nsu: Option<String>,
    max_nsu: Option<String>,
    docs: Vec<DocZip>,
}

struct DocZip {
    nsu: String,
    payload_b64: String,
}

fn parse_envelope(body: &str) -> Result<EnvelopeFields, ParseError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut fields = EnvelopeFields::default();
    let mut capture: Option<&'static str> = None;
    let mut buf = String::new();
    let mut doc_nsu = String::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| ParseError::MalformedXml(e.to_string()))?
        {
            Event::Start(e) => {
                buf.clear();
                capture = match e.local_name().as_ref() {
                    b"cStat" if fields.c_stat.is_none() => Some("cStat"),
                    b"xMotivo" if fields.x_motivo.is_none() => Some("xMotivo"),
                    b"ultNSU" => Some("ultNSU"),
                    b"maxNSU" => Some("maxNSU"),
                    b"docZip" => {
                        doc_nsu = attribute(&e, b"NSU").unwrap_or_default();
                        Some("docZip")
                    }
                    _ => None,
                };
            }
            Event::Text(e) => {
                if capture.is_some() {
                    buf.push_str(
                        &e.unescape()
                            .map_err(|e| ParseError::MalformedXml(e.to_string()))?,
                    );
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                match capture.take() {
                    Some("cStat") => fields.c_stat = Some(std::mem::take(&mut buf)),
                    Some("xMotivo") => fields.x_motivo = Some(std::mem::take(&mut buf)),
                    Some("ultNSU") => fields.ult_nsu = Some(std::mem::take(&mut buf)),
                    Some("maxNSU") => fields.max_nsu = Some(std::mem::take(&mut buf)),
                    Some("docZip") => fields.docs.push(DocZip {
                        nsu: std::mem::take(&mut doc_nsu),
                        payload_b64: std::mem::take(&mut buf),
                    }),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fields)
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Decodes one `docZip` into a [`NotaFiscal`]: base64, then gzip, then the
/// document itself (`resNFe` summary or full `nfeProc`).
fn decode_doc(doc: &DocZip) -> Result<NotaFiscal, RecordParseError> {
    let record_err = |reason: String| RecordParseError {
        nsu: doc.nsu.clone(),
        reason,
    };

    let cleaned: String = doc
        .payload_b64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let compressed = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| record_err(format!("invalid base64: {e}")))?;

    let mut xml = String::new();
    GzDecoder::new(&compressed[..])
        .read_to_string(&mut xml)
        .map_err(|e| record_err(format!("gzip decompression failed: {e}")))?;

    parse_document(&xml, &doc.nsu)
}

fn parse_document(xml: &str, nsu: &str) -> Result<NotaFiscal, RecordParseError> {
    let record_err = |reason: &str| RecordParseError {
        nsu: nsu.to_string(),
        reason: reason.to_string(),
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut chave = String::new();
    let mut dh_emi = String::new();
    let mut cnpj = String::new();
    let mut nome = String::new();
    let mut v_nf = String::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| record_err(&format!("malformed document XML: {e}")))?
        {
            Event::Start(e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if local == "infNFe" && chave.is_empty() {
                    if let Some(id) = attribute(&e, b"Id") {
                        chave = id.trim_start_matches("NFe").to_string();
                    }
                }
                stack.push(local);
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"infNFe" && chave.is_empty() {
                    if let Some(id) = attribute(&e, b"Id") {
                        chave = id.trim_start_matches("NFe").to_string();
                    }
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| record_err(&format!("malformed document XML: {e}")))?;
                let current = stack.last().map(String::as_str).unwrap_or("");
                let parent = stack
                    .iter()
                    .rev()
                    .nth(1)
                    .map(String::as_str)
                    .unwrap_or("");
                match current {
                    "chNFe" if chave.is_empty() => chave = text.into_owned(),
                    "dhEmi" if dh_emi.is_empty() => dh_emi = text.into_owned(),
                    "vNF" if v_nf.is_empty() => v_nf = text.into_owned(),
                    // Emitter only: dest carries a CNPJ/xNome pair as well
                    "CNPJ" if cnpj.is_empty() && matches!(parent, "emit" | "resNFe") => {
                        cnpj = text.into_owned()
                    }
                    "xNome" if nome.is_empty() && matches!(parent, "emit" | "resNFe") => {
                        nome = text.into_owned()
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if chave.is_empty() {
        return Err(record_err("missing access key (chNFe / infNFe Id)"));
    }
    if dh_emi.is_empty() {
        return Err(record_err("missing issue date (dhEmi)"));
    }

    let data_emissao = DateTime::parse_from_rfc3339(dh_emi.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| record_err(&format!("unparseable dhEmi '{dh_emi}': {e}")))?;

    let valor_total = v_nf.trim().parse::<f64>().unwrap_or(0.0);

    Ok(NotaFiscal {
        chave,
        nsu: nsu.to_string(),
        data_emissao,
        fornecedor_cnpj: cnpj,
        fornecedor_nome: nome,
        valor_total,
        xml_content: xml.to_string(),
    })
}
