//! Running routing counters and the auditable cost report built from them.

use resilient_fetch::FetchStatistics;
use serde::Serialize;
use session_sources::DataSource;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What one `ingest` call contributed to the totals.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// Source whose records were returned; `None` when the request failed.
    pub served_by: Option<DataSource>,
    pub fallback: bool,
    pub forced: bool,
    pub meetings: usize,
    pub speeches: usize,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    failed_requests: u64,
    forced_requests: u64,
    fallback_count: u64,
    historical_served: u64,
    realtime_served: u64,
    total_meetings: u64,
    total_speeches: u64,
    total_processing_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingStatistics {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub forced_requests: u64,
    pub fallback_count: u64,
    pub historical_requests: u64,
    pub realtime_requests: u64,
    pub historical_percentage: f64,
    pub realtime_percentage: f64,
    pub fallback_rate: f64,
    pub total_meetings: u64,
    pub total_speeches: u64,
    pub total_processing_seconds: f64,
    /// Meetings ingested per second of processing time.
    pub throughput: f64,
    pub estimated_cost: f64,
    pub fetch: FetchStatistics,
}

/// Additive counters; only `reset` ever lowers them.
#[derive(Debug)]
pub struct StatisticsAggregator {
    counters: Mutex<Counters>,
    realtime_unit_cost: f64,
}

impl StatisticsAggregator {
    pub fn new(realtime_unit_cost: f64) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            realtime_unit_cost,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, outcome: &IngestOutcome) {
        let mut counters = self.lock();
        counters.total_requests += 1;
        if outcome.forced {
            counters.forced_requests += 1;
        }
        if outcome.fallback {
            counters.fallback_count += 1;
        }
        match outcome.served_by {
            Some(DataSource::Historical) => counters.historical_served += 1,
            Some(DataSource::Realtime) => counters.realtime_served += 1,
            None => counters.failed_requests += 1,
        }
        counters.total_meetings += outcome.meetings as u64;
        counters.total_speeches += outcome.speeches as u64;
        counters.total_processing_seconds += outcome.processing_time_seconds.max(0.0);
    }

    pub fn reset(&self) {
        *self.lock() = Counters::default();
    }

    pub fn report(&self, fetch: FetchStatistics) -> RoutingStatistics {
        let counters = self.lock();
        let share = |n: u64| {
            if counters.total_requests == 0 {
                0.0
            } else {
                n as f64 / counters.total_requests as f64
            }
        };
        let throughput = if counters.total_processing_seconds > 0.0 {
            counters.total_meetings as f64 / counters.total_processing_seconds
        } else {
            0.0
        };

        RoutingStatistics {
            total_requests: counters.total_requests,
            failed_requests: counters.failed_requests,
            forced_requests: counters.forced_requests,
            fallback_count: counters.fallback_count,
            historical_requests: counters.historical_served,
            realtime_requests: counters.realtime_served,
            historical_percentage: share(counters.historical_served) * 100.0,
            realtime_percentage: share(counters.realtime_served) * 100.0,
            fallback_rate: share(counters.fallback_count),
            total_meetings: counters.total_meetings,
            total_speeches: counters.total_speeches,
            total_processing_seconds: counters.total_processing_seconds,
            throughput,
            estimated_cost: counters.realtime_served as f64 * self.realtime_unit_cost,
            fetch,
        }
    }
}
