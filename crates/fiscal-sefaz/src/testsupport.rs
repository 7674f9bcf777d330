//! Fixture builders for unit tests: canned distribution responses with
//! gzip-compressed docZip payloads, shaped like the live service's.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};

/// Generates a throwaway self-signed PKCS#12 bundle, base64-encoded the way
/// callers ship them.
pub fn make_p12(passphrase: &str, not_after_unix: i64) -> String {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "EMPRESA TESTE LTDA")
        .unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(not_after_unix - 86_400 * 30).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(not_after_unix).unwrap())
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let mut p12 = Pkcs12::builder();
    p12.name("teste").pkey(&pkey).cert(&cert);
    let der = p12.build2(passphrase).unwrap().to_der().unwrap();
    BASE64.encode(der)
}

pub fn gzip_b64(xml: &str) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    BASE64.encode(encoder.finish().unwrap())
}

/// A minimal `resNFe` summary document, already gzip + base64 encoded.
pub fn res_nfe(chave: &str, dh_emi: &str, v_nf: &str) -> String {
    gzip_b64(&format!(
        r#"<resNFe xmlns="http://www.portalfiscal.inf.br/nfe" versao="1.01">
    <chNFe>{chave}</chNFe>
    <CNPJ>14309992000148</CNPJ>
    <xNome>FORNECEDOR TESTE LTDA</xNome>
    <dhEmi>{dh_emi}</dhEmi>
    <vNF>{v_nf}</vNF>
    <cSitNFe>1</cSitNFe>
</resNFe>"#
    ))
}

/// A full SOAP distribution response wrapping `retDistDFeInt`.
pub fn dist_response(
    c_stat: u16,
    x_motivo: &str,
    ult_nsu: u64,
    max_nsu: u64,
    docs: &[(&str, String)],
) -> String {
    let doc_zips: String = docs
        .iter()
        .map(|(nsu, payload)| {
            format!(
                r#"<docZip NSU="{nsu}" schema="resNFe_v1.01.xsd">{payload}</docZip>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
    <soap:Body>
        <nfeDistDFeInteresseResponse xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeDistribuicaoDFe">
            <nfeDistDFeInteresseResult>
                <retDistDFeInt xmlns="http://www.portalfiscal.inf.br/nfe" versao="1.01">
                    <tpAmb>1</tpAmb>
                    <cStat>{c_stat}</cStat>
                    <xMotivo>{x_motivo}</xMotivo>
                    <dhResp>2025-09-10T12:00:00-03:00</dhResp>
                    <ultNSU>{ult_nsu:015}</ultNSU>
                    <maxNSU>{max_nsu:015}</maxNSU>
                    <loteDistDFeInt>{doc_zips}</loteDistDFeInt>
                </retDistDFeInt>
            </nfeDistDFeInteresseResult>
        </nfeDistDFeInteresseResponse>
    </soap:Body>
</soap:Envelope>"#
    )
}
