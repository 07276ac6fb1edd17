//! Routed ingestion with a single fallback to the other source.

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::gateway::{HistoricalApiAdapter, RealtimeTranscriptionAdapter};
use crate::routing::{self, IngestionRequest, RoutingConfig, RoutingDecision};
use crate::statistics::{IngestOutcome, RoutingStatistics, StatisticsAggregator};
use log::*;
use resilient_fetch::{ExecutorConfig, FetchExecutor};
use serde::Serialize;
use service::config::Config;
use session_sources::{DataSource, Meeting, Normalized, SourceAdapter, Speech};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of one `ingest` call.
///
/// `success == false` is the only failure signal; an empty result for a quiet
/// date is a valid success.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionResult {
    pub success: bool,
    pub data_source: DataSource,
    pub meeting_count: usize,
    pub speech_count: usize,
    pub processing_time_seconds: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip)]
    pub meetings: Vec<Meeting>,
    #[serde(skip)]
    pub speeches: Vec<Speech>,
}

impl IngestionResult {
    fn failed(data_source: DataSource) -> Self {
        Self {
            success: false,
            data_source,
            meeting_count: 0,
            speech_count: 0,
            processing_time_seconds: 0.0,
            warnings: Vec::new(),
            errors: Vec::new(),
            meetings: Vec::new(),
            speeches: Vec::new(),
        }
    }

    fn served(data_source: DataSource, normalized: Normalized) -> Self {
        let Normalized {
            meetings,
            mut speeches,
            mut warnings,
        } = normalized;

        // Every speech must belong to a returned meeting.
        let meeting_ids: HashSet<&str> = meetings.iter().map(|m| m.meeting_id.as_str()).collect();
        let before = speeches.len();
        speeches.retain(|speech| meeting_ids.contains(speech.meeting_id.as_str()));
        let orphaned = before - speeches.len();
        if orphaned > 0 {
            warnings.push(format!(
                "{data_source}: dropped {orphaned} speech(es) without a matching meeting"
            ));
        }

        Self {
            success: true,
            data_source,
            meeting_count: meetings.len(),
            speech_count: speeches.len(),
            processing_time_seconds: 0.0,
            warnings,
            errors: Vec::new(),
            meetings,
            speeches,
        }
    }
}

/// Translate the service config into executor settings.
pub fn executor_config(config: &Config) -> ExecutorConfig {
    ExecutorConfig {
        rate_limit_capacity: config.rate_limit_capacity,
        rate_limit_per_second: config.rate_limit_per_second,
        max_retries: config.max_retries,
        retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        retry_max_delay: Duration::from_millis(config.retry_max_delay_ms),
        fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        max_concurrent_fetches: config.max_concurrent_fetches,
        job_history_limit: config.job_history_limit,
        cache_capacity: config.cache_capacity,
        user_agent: config.http_user_agent.clone(),
    }
}

pub struct IngestionRouter {
    historical: Arc<dyn SourceAdapter>,
    realtime: Arc<dyn SourceAdapter>,
    config: RoutingConfig,
    statistics: StatisticsAggregator,
    executor: Option<Arc<FetchExecutor>>,
}

impl IngestionRouter {
    pub fn new(
        historical: Arc<dyn SourceAdapter>,
        realtime: Arc<dyn SourceAdapter>,
        config: RoutingConfig,
    ) -> Result<Self, Error> {
        for (adapter, expected) in [
            (&historical, DataSource::Historical),
            (&realtime, DataSource::Realtime),
        ] {
            if adapter.source() != expected {
                warn!(
                    "Adapter for {} reports source {}",
                    expected,
                    adapter.source()
                );
                return Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
                });
            }
        }

        Ok(Self {
            historical,
            realtime,
            statistics: StatisticsAggregator::new(config.realtime_unit_cost),
            config,
            executor: None,
        })
    }

    /// Build the shared executor, both adapters and the router from `config`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let executor = Arc::new(FetchExecutor::new(executor_config(config))?);
        let cache_ttl = Duration::from_secs(config.cache_ttl_secs);

        let historical =
            HistoricalApiAdapter::new(executor.clone(), config.historical_base_url(), cache_ttl);
        let realtime = RealtimeTranscriptionAdapter::new(
            executor.clone(),
            config.realtime_base_url(),
            config.realtime_api_key().as_deref(),
            cache_ttl,
        )?;

        Ok(Self::new(
            Arc::new(historical),
            Arc::new(realtime),
            RoutingConfig::from(config),
        )?
        .with_executor(executor))
    }

    /// Attach the executor whose counters are embedded in the statistics report.
    pub fn with_executor(mut self, executor: Arc<FetchExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn decide(&self, request: &IngestionRequest) -> RoutingDecision {
        routing::decide(request, &self.config)
    }

    /// Ingest with the configured default deadline, if any.
    pub async fn ingest(&self, request: &IngestionRequest) -> IngestionResult {
        match self.config.ingest_deadline {
            Some(deadline) => self.ingest_with_deadline(request, deadline).await,
            None => self.route(request).await,
        }
    }

    /// Ingest, aborting any in-flight fetch once `deadline` has passed.
    pub async fn ingest_with_deadline(
        &self,
        request: &IngestionRequest,
        deadline: Duration,
    ) -> IngestionResult {
        let started = Instant::now();
        match tokio::time::timeout(deadline, self.route(request)).await {
            Ok(result) => result,
            Err(_) => {
                let decision = self.decide(request);
                warn!(
                    "Ingestion of {} exceeded its {:?} deadline",
                    request.meeting_date, deadline
                );
                let mut result = IngestionResult::failed(decision.selected_source);
                result.errors.push(format!(
                    "deadline exceeded after {}s",
                    deadline.as_secs_f64()
                ));
                result.processing_time_seconds = started.elapsed().as_secs_f64();
                self.statistics.record(&IngestOutcome {
                    served_by: None,
                    fallback: false,
                    forced: request.is_forced(),
                    meetings: 0,
                    speeches: 0,
                    processing_time_seconds: result.processing_time_seconds,
                });
                result
            }
        }
    }

    pub fn get_routing_statistics(&self) -> RoutingStatistics {
        let fetch = self
            .executor
            .as_ref()
            .map(|executor| executor.statistics())
            .unwrap_or_default();
        self.statistics.report(fetch)
    }

    fn adapter_for(&self, source: DataSource) -> &dyn SourceAdapter {
        match source {
            DataSource::Historical => self.historical.as_ref(),
            DataSource::Realtime => self.realtime.as_ref(),
        }
    }

    async fn fetch_and_normalize(
        &self,
        source: DataSource,
        request: &IngestionRequest,
    ) -> Result<Normalized, session_sources::Error> {
        let adapter = self.adapter_for(source);
        let raw = adapter
            .fetch_raw(request.meeting_date, request.session_number)
            .await?;
        Ok(adapter.normalize(&raw))
    }

    async fn route(&self, request: &IngestionRequest) -> IngestionResult {
        let started = Instant::now();
        let decision = self.decide(request);
        let primary = decision.selected_source;
        info!(
            "Routing {} to {}: {} (confidence {:.2})",
            request.meeting_date, primary, decision.rationale, decision.confidence
        );

        let mut fallback = false;
        let mut result = match self.fetch_and_normalize(primary, request).await {
            Ok(normalized) => IngestionResult::served(primary, normalized),
            Err(primary_err) => {
                warn!("{} ingestion for {} failed: {}", primary, request.meeting_date, primary_err);
                if request.is_forced() && !self.config.allow_forced_fallback {
                    let mut result = IngestionResult::failed(primary);
                    result.errors.push(primary_err.to_string());
                    result
                } else {
                    fallback = true;
                    let secondary = primary.other();
                    match self.fetch_and_normalize(secondary, request).await {
                        Ok(normalized) => {
                            let mut result = IngestionResult::served(secondary, normalized);
                            result
                                .warnings
                                .insert(0, format!("Fallback: {primary} failed, used {secondary}"));
                            result.warnings.insert(1, primary_err.to_string());
                            result
                        }
                        Err(secondary_err) => {
                            error!(
                                "Both sources failed for {}: {}; {}",
                                request.meeting_date, primary_err, secondary_err
                            );
                            let mut result = IngestionResult::failed(primary);
                            result.errors.push(primary_err.to_string());
                            result.errors.push(secondary_err.to_string());
                            result
                        }
                    }
                }
            }
        };

        result.processing_time_seconds = started.elapsed().as_secs_f64();
        self.statistics.record(&IngestOutcome {
            served_by: result.success.then_some(result.data_source),
            fallback,
            forced: request.is_forced(),
            meetings: result.meeting_count,
            speeches: result.speech_count,
            processing_time_seconds: result.processing_time_seconds,
        });

        debug!(
            "Ingested {} meeting(s) and {} speech(es) for {} from {}",
            result.meeting_count, result.speech_count, request.meeting_date, result.data_source
        );
        result
    }
}
