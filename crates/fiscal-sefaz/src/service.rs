//! Query orchestration
//!
//! The state machine behind one whole query: resolve candidate endpoints,
//! try them in priority order, paginate the NSU stream on whichever
//! endpoint answers, and aggregate the pages into one ordered,
//! deduplicated result. Certificate problems and request problems fail
//! immediately; availability problems fall through to the next endpoint.
//!
//! Dropping the returned future cancels the query: the in-flight request is
//! aborted, its connection closed, and the certificate bundle freed with it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fiscal_core::{validar_cnpj, validar_periodo, ConsultaRequest, Periodo};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::certificate::{CertificateBundle, CertificateStore};
use crate::client::{SefazClient, SefazTransport};
use crate::endpoints::{resolve, Endpoint, Uf};
use crate::envelope::{EnvelopeBuilder, SoapOperation};
use crate::errors::{ConsultaError, ValidationError};
use crate::models::{ConsultaResult, DfeStatus, NotaFiscal, Nsu, TpAmb};
use crate::parser;

/// Tuning knobs for one service instance. All retry/backoff behavior is
/// explicit here so tests can run with zero delays.
#[derive(Debug, Clone)]
pub struct SefazConfig {
    pub tp_amb: TpAmb,
    pub operation: SoapOperation,
    /// Timeout for one network round trip (connect + handshake + response)
    pub request_timeout: Duration,
    /// Overall budget for the whole query, retries and pagination included
    pub query_deadline: Duration,
    /// How many times a throttled endpoint is retried before falling
    /// through to the next one
    pub throttle_retries: u32,
    /// Base delay before a throttle retry; doubles on each attempt
    pub throttle_backoff: Duration,
}

impl Default for SefazConfig {
    fn default() -> Self {
        Self {
            tp_amb: TpAmb::Producao,
            operation: SoapOperation::DistNsu,
            request_timeout: Duration::from_secs(30),
            query_deadline: Duration::from_secs(120),
            throttle_retries: 3,
            throttle_backoff: Duration::from_secs(1),
        }
    }
}

/// Orchestrates distribution queries end to end.
pub struct ConsultaService {
    transport: Arc<dyn SefazTransport>,
    config: SefazConfig,
    endpoints_override: Option<Vec<Endpoint>>,
}

impl ConsultaService {
    pub fn new(transport: Arc<dyn SefazTransport>, config: SefazConfig) -> Self {
        Self {
            transport,
            config,
            endpoints_override: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SefazClient::new()), SefazConfig::default())
    }

    /// Pins the candidate endpoints instead of resolving them from the
    /// jurisdiction. Order still matters: first entry is tried first.
    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints_override = Some(endpoints);
        self
    }

    /// Runs one whole query from the caller's request, starting at NSU 0.
    pub async fn consultar(
        &self,
        request: &ConsultaRequest,
    ) -> Result<ConsultaResult, ConsultaError> {
        self.consultar_desde(request, Nsu::ZERO).await
    }

    /// Runs one whole query resuming from a caller-supplied cursor.
    pub async fn consultar_desde(
        &self,
        request: &ConsultaRequest,
        start: Nsu,
    ) -> Result<ConsultaResult, ConsultaError> {
        let cnpj = validar_cnpj(&request.cnpj_empresa)?;
        let periodo = validar_periodo(&request.data_inicio, &request.data_fim)?;
        let uf = Uf::from_code(&request.estado)
            .ok_or_else(|| ValidationError::UnknownJurisdiction(request.estado.clone()))?;

        // Fails before any network call on a bad bundle
        let bundle =
            CertificateStore::load(&request.certificado_base64, &request.senha_certificado)?;

        info!(cnpj = %cnpj, uf = ?uf, inicio = %request.data_inicio, fim = %request.data_fim,
              "starting distribution query");

        match timeout(
            self.config.query_deadline,
            self.run(&cnpj, periodo, uf, &bundle, start),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ConsultaError::DeadlineExceeded {
                deadline_secs: self.config.query_deadline.as_secs(),
            }),
        }
    }

    fn candidate_endpoints(&self, uf: Uf) -> Vec<Endpoint> {
        match &self.endpoints_override {
            Some(endpoints) => endpoints.clone(),
            None => resolve(uf),
        }
    }

    async fn run(
        &self,
        cnpj: &str,
        periodo: Periodo,
        uf: Uf,
        bundle: &CertificateBundle,
        start: Nsu,
    ) -> Result<ConsultaResult, ConsultaError> {
        let endpoints = self.candidate_endpoints(uf);
        let builder = EnvelopeBuilder::new(uf, self.config.tp_amb);

        let mut cursor = start;
        let mut notas: Vec<NotaFiscal> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut total_consultado = 0usize;
        let mut total_ignoradas = 0usize;
        let mut attempted: Vec<String> = Vec::new();
        let mut last_error = String::from("no endpoints attempted");

        'endpoints: for endpoint in &endpoints {
            attempted.push(endpoint.url.clone());
            let mut throttle_attempts = 0u32;

            // Pagination stays on this endpoint; only availability problems
            // move us to the next one.
            loop {
                let envelope = builder.build(cnpj, cursor, self.config.operation)?;

                let raw = match self
                    .transport
                    .send(endpoint, bundle, &envelope, self.config.request_timeout)
                    .await
                {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(endpoint = %endpoint.url, error = %e, "transport failure, trying next endpoint");
                        last_error = e.to_string();
                        continue 'endpoints;
                    }
                };

                let batch = match parser::parse(&raw) {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(endpoint = %endpoint.url, error = %e, "unusable response, trying next endpoint");
                        last_error = format!("{} ({})", e, endpoint.url);
                        continue 'endpoints;
                    }
                };

                total_ignoradas += batch.skipped;

                match batch.status {
                    DfeStatus::AuthenticationRejected => {
                        return Err(ConsultaError::AuthenticationRejected {
                            endpoint: endpoint.url.clone(),
                            c_stat: batch.c_stat,
                            motivo: batch.x_motivo,
                        });
                    }
                    DfeStatus::MalformedRequest => {
                        return Err(ConsultaError::MalformedRequest {
                            endpoint: endpoint.url.clone(),
                            c_stat: batch.c_stat,
                            motivo: batch.x_motivo,
                        });
                    }
                    DfeStatus::Throttled => {
                        if throttle_attempts >= self.config.throttle_retries {
                            warn!(endpoint = %endpoint.url, "throttle retry budget exhausted, trying next endpoint");
                            last_error = format!(
                                "throttled beyond retry budget at {} (cStat {}: {})",
                                endpoint.url, batch.c_stat, batch.x_motivo
                            );
                            continue 'endpoints;
                        }
                        throttle_attempts += 1;
                        let delay =
                            self.config.throttle_backoff * (1u32 << (throttle_attempts - 1));
                        debug!(endpoint = %endpoint.url, attempt = throttle_attempts,
                               delay_ms = delay.as_millis() as u64, "throttled, backing off");
                        sleep(delay).await;
                    }
                    DfeStatus::Unknown(code) => {
                        warn!(endpoint = %endpoint.url, c_stat = code, motivo = %batch.x_motivo,
                              "unknown protocol status, trying next endpoint");
                        last_error = format!(
                            "unknown protocol status {} at {}: {}",
                            code, endpoint.url, batch.x_motivo
                        );
                        continue 'endpoints;
                    }
                    DfeStatus::NoData => {
                        info!(endpoint = %endpoint.url, "no documents for this recipient");
                        return Ok(Self::finish(
                            notas,
                            DfeStatus::NoData,
                            total_consultado,
                            total_ignoradas,
                            cursor,
                        ));
                    }
                    DfeStatus::OkHasMore => {
                        total_consultado += batch.notas.len();
                        Self::absorb(&mut notas, &mut seen, batch.notas, periodo);
                        cursor = batch.ult_nsu;
                        throttle_attempts = 0;
                        debug!(endpoint = %endpoint.url, cursor = %cursor, collected = notas.len(),
                               "page absorbed, requesting next");
                    }
                    DfeStatus::OkComplete => {
                        total_consultado += batch.notas.len();
                        Self::absorb(&mut notas, &mut seen, batch.notas, periodo);
                        cursor = batch.ult_nsu;
                        info!(endpoint = %endpoint.url, total = notas.len(),
                              skipped = total_ignoradas, "distribution stream exhausted");
                        return Ok(Self::finish(
                            notas,
                            DfeStatus::OkComplete,
                            total_consultado,
                            total_ignoradas,
                            cursor,
                        ));
                    }
                }
            }
        }

        Err(ConsultaError::EndpointsExhausted {
            attempted,
            last_error,
        })
    }

    /// Folds a page into the aggregate: window filter first, then
    /// cross-page dedup.
    fn absorb(
        collected: &mut Vec<NotaFiscal>,
        seen: &mut HashSet<String>,
        page: Vec<NotaFiscal>,
        periodo: Periodo,
    ) {
        for nota in page {
            if !periodo.contains(nota.data_emissao.date_naive()) {
                debug!(chave = %nota.chave, emissao = %nota.data_emissao, "outside query window, dropped");
                continue;
            }
            if seen.insert(nota.dedup_key().to_string()) {
                collected.push(nota);
            } else {
                debug!(chave = %nota.chave, "duplicate across pages, dropped");
            }
        }
    }

    fn finish(
        mut notas: Vec<NotaFiscal>,
        status: DfeStatus,
        total_consultado: usize,
        total_ignoradas: usize,
        ultimo_nsu: Nsu,
    ) -> ConsultaResult {
        notas.sort_by(|a, b| {
            a.data_emissao.cmp(&b.data_emissao).then_with(|| {
                let left = Nsu::parse(&a.nsu).unwrap_or(Nsu::ZERO);
                let right = Nsu::parse(&b.nsu).unwrap_or(Nsu::ZERO);
                left.cmp(&right)
            })
        });
        ConsultaResult {
            notas,
            status,
            total_consultado,
            total_ignoradas,
            ultimo_nsu,
        }
    }
}
