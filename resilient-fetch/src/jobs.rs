//! Lifecycle tracking for outbound fetches.
//!
//! Jobs move `Pending -> Running -> (Retrying -> Running)* -> Succeeded | Failed`.
//! A cache hit goes straight from `Pending` to `Succeeded`. Every transition is
//! appended to the job's history; nothing leaves a terminal status.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Retrying,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending, Running) | (Pending, Succeeded) | (Pending, Failed) => true,
            (Running, Retrying) | (Running, Succeeded) | (Running, Failed) => true,
            (Retrying, Running) | (Retrying, Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobTransition {
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

/// One outbound fetch.
#[derive(Debug, Clone, Serialize)]
pub struct FetchJob {
    pub job_id: String,
    pub url: String,
    pub status: JobStatus,
    pub attempt_count: u32,
    /// The response came from the cache (fresh, or stale after upstream failure).
    pub cached: bool,
    pub history: Vec<JobTransition>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct TrackerInner {
    jobs: HashMap<String, FetchJob>,
    finished: VecDeque<String>,
}

/// Registry of fetch jobs, with bounded retention of finished ones.
#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<Mutex<TrackerInner>>,
    history_limit: usize,
}

impl JobTracker {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerInner::default())),
            history_limit: history_limit.max(1),
        }
    }

    /// Register a new job in `Pending` and return its id.
    pub fn create(&self, url: &str) -> String {
        let job_id = Uuid::new_v4().to_string();
        let job = FetchJob {
            job_id: job_id.clone(),
            url: url.to_string(),
            status: JobStatus::Pending,
            attempt_count: 0,
            cached: false,
            history: vec![JobTransition {
                status: JobStatus::Pending,
                at: Utc::now(),
            }],
            last_error: None,
        };
        self.lock().jobs.insert(job_id.clone(), job);
        job_id
    }

    /// Move a job to `next`. Illegal transitions are logged and ignored.
    pub fn transition(&self, job_id: &str, next: JobStatus) -> bool {
        let mut inner = self.lock();
        let Some(job) = inner.jobs.get_mut(job_id) else {
            warn!("Transition to {:?} for unknown job {}", next, job_id);
            return false;
        };
        if !job.status.can_transition_to(next) {
            warn!(
                "Rejected job {} transition {:?} -> {:?}",
                job_id, job.status, next
            );
            return false;
        }

        job.status = next;
        job.history.push(JobTransition {
            status: next,
            at: Utc::now(),
        });
        if next == JobStatus::Running {
            job.attempt_count += 1;
        }
        if next.is_terminal() {
            inner.finished.push_back(job_id.to_string());
            self.evict(&mut inner);
        }
        true
    }

    pub fn mark_cached(&self, job_id: &str) {
        if let Some(job) = self.lock().jobs.get_mut(job_id) {
            job.cached = true;
        }
    }

    pub fn record_error(&self, job_id: &str, error: &str) {
        if let Some(job) = self.lock().jobs.get_mut(job_id) {
            job.last_error = Some(error.to_string());
        }
    }

    pub fn get(&self, job_id: &str) -> Option<FetchJob> {
        self.lock().jobs.get(job_id).cloned()
    }

    pub fn snapshot(&self) -> Vec<FetchJob> {
        self.lock().jobs.values().cloned().collect()
    }

    pub fn counts_by_status(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for job in self.lock().jobs.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }

    fn evict(&self, inner: &mut TrackerInner) {
        while inner.finished.len() > self.history_limit {
            if let Some(oldest) = inner.finished.pop_front() {
                inner.jobs.remove(&oldest);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fails the job on drop unless it already reached a terminal status.
///
/// Keeps the one-terminal-status rule when a fetch future is cancelled.
pub(crate) struct JobGuard {
    tracker: JobTracker,
    job_id: String,
}

impl JobGuard {
    pub(crate) fn new(tracker: JobTracker, job_id: String) -> Self {
        Self { tracker, job_id }
    }

    pub(crate) fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let status = self.tracker.get(&self.job_id).map(|job| job.status);
        if let Some(status) = status {
            if !status.is_terminal() {
                self.tracker.record_error(&self.job_id, "cancelled");
                self.tracker.transition(&self.job_id, JobStatus::Failed);
            }
        }
    }
}
