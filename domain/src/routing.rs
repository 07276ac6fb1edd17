//! Source selection for a single ingestion request.
//!
//! `decide` is pure: the same request and configuration always produce the
//! same decision, and nothing here touches the network.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use service::config::Config;
use session_sources::DataSource;
use std::time::Duration;

pub const MANUAL_OVERRIDE: &str = "manual override";

/// One request to ingest the records of a meeting date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub meeting_date: NaiveDate,
    pub session_number: Option<u32>,
    pub force_source: Option<DataSource>,
}

impl IngestionRequest {
    pub fn new(meeting_date: NaiveDate) -> Self {
        Self {
            meeting_date,
            session_number: None,
            force_source: None,
        }
    }

    pub fn with_session_number(mut self, session_number: u32) -> Self {
        self.session_number = Some(session_number);
        self
    }

    pub fn with_forced_source(mut self, source: DataSource) -> Self {
        self.force_source = Some(source);
        self
    }

    pub fn is_forced(&self) -> bool {
        self.force_source.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub selected_source: DataSource,
    pub rationale: String,
    /// In `[0, 1]`; values below 1.0 flag dates close to the session boundary.
    pub confidence: f64,
}

/// Routing knobs, usually taken from the service `Config`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    /// First day of the session that is not yet archived.
    pub session_cutoff_date: NaiveDate,
    pub grace_window_days: u32,
    pub min_edge_confidence: f64,
    pub allow_forced_fallback: bool,
    pub ingest_deadline: Option<Duration>,
    pub realtime_unit_cost: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            session_cutoff_date: NaiveDate::from_ymd_opt(2024, 5, 30).unwrap_or_default(),
            grace_window_days: 7,
            min_edge_confidence: 0.6,
            allow_forced_fallback: false,
            ingest_deadline: None,
            realtime_unit_cost: 0.25,
        }
    }
}

impl From<&Config> for RoutingConfig {
    fn from(config: &Config) -> Self {
        Self {
            session_cutoff_date: config.session_cutoff_date,
            grace_window_days: config.grace_window_days,
            min_edge_confidence: config.min_edge_confidence,
            allow_forced_fallback: config.allow_forced_fallback,
            ingest_deadline: config.ingest_deadline_secs.map(Duration::from_secs),
            realtime_unit_cost: config.realtime_unit_cost,
        }
    }
}

pub fn decide(request: &IngestionRequest, config: &RoutingConfig) -> RoutingDecision {
    if let Some(source) = request.force_source {
        return RoutingDecision {
            selected_source: source,
            rationale: MANUAL_OVERRIDE.to_string(),
            confidence: 1.0,
        };
    }

    let cutoff = config.session_cutoff_date;
    if request.meeting_date < cutoff {
        return RoutingDecision {
            selected_source: DataSource::Historical,
            rationale: format!(
                "historical-window: {} is before session cutoff {}",
                request.meeting_date, cutoff
            ),
            confidence: 1.0,
        };
    }

    let days_after = (request.meeting_date - cutoff).num_days();
    RoutingDecision {
        selected_source: DataSource::Realtime,
        rationale: format!(
            "realtime-window: {} is {} day(s) after session cutoff {}",
            request.meeting_date, days_after, cutoff
        ),
        confidence: edge_confidence(days_after, config),
    }
}

// Linear from min_edge_confidence on the cutoff day up to 1.0 at the end of the grace window.
fn edge_confidence(days_after: i64, config: &RoutingConfig) -> f64 {
    let floor = config.min_edge_confidence.clamp(0.0, 1.0);
    let window = i64::from(config.grace_window_days);
    if window == 0 || days_after >= window {
        return 1.0;
    }
    let progress = days_after.max(0) as f64 / window as f64;
    floor + (1.0 - floor) * progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn cutoff() -> NaiveDate {
        RoutingConfig::default().session_cutoff_date
    }

    fn request(date: NaiveDate) -> IngestionRequest {
        IngestionRequest::new(date)
    }

    #[test]
    fn dates_before_cutoff_route_to_historical_with_full_confidence() {
        let config = RoutingConfig::default();
        for days in [1, 2, 7, 30, 400] {
            let date = cutoff() - Days::new(days);
            let decision = decide(&request(date), &config);
            assert_eq!(decision.selected_source, DataSource::Historical);
            assert_eq!(decision.confidence, 1.0);
            assert!(decision.rationale.starts_with("historical-window"));
        }
    }

    #[test]
    fn dates_on_or_after_cutoff_route_to_realtime() {
        let config = RoutingConfig::default();
        for days in [0, 1, 6, 7, 90] {
            let date = cutoff() + Days::new(days);
            let decision = decide(&request(date), &config);
            assert_eq!(decision.selected_source, DataSource::Realtime);
            assert!(decision.rationale.starts_with("realtime-window"));
        }
    }

    #[test]
    fn confidence_rises_linearly_across_the_grace_window() {
        let config = RoutingConfig::default();
        let confidence = |days| decide(&request(cutoff() + Days::new(days)), &config).confidence;

        assert!((confidence(0) - 0.6).abs() < 1e-9);
        assert!(confidence(1) > confidence(0));
        assert!(confidence(6) < 1.0);
        assert_eq!(confidence(7), 1.0);
        assert_eq!(confidence(30), 1.0);
        let expected_midpoint = 0.6 + 0.4 * (3.0 / 7.0);
        assert!((confidence(3) - expected_midpoint).abs() < 1e-9);
    }

    #[test]
    fn zero_grace_window_disables_decay() {
        let config = RoutingConfig {
            grace_window_days: 0,
            ..RoutingConfig::default()
        };
        assert_eq!(decide(&request(cutoff()), &config).confidence, 1.0);
    }

    #[test]
    fn forced_source_always_wins() {
        let config = RoutingConfig::default();
        for (date, source) in [
            (cutoff() + Days::new(1), DataSource::Historical),
            (cutoff() - Days::new(30), DataSource::Realtime),
            (cutoff(), DataSource::Historical),
        ] {
            let decision = decide(&request(date).with_forced_source(source), &config);
            assert_eq!(decision.selected_source, source);
            assert_eq!(decision.confidence, 1.0);
            assert_eq!(decision.rationale, MANUAL_OVERRIDE);
        }
    }

    #[test]
    fn decide_is_deterministic() {
        let config = RoutingConfig::default();
        let req = request(cutoff() + Days::new(2)).with_session_number(415);
        assert_eq!(decide(&req, &config), decide(&req, &config));
    }
}
