//! Resilient fetch executor.
//!
//! Composes the cache, rate limiter, job tracker and backoff policy into the one
//! way upstream sources are called. Order per fetch: fresh-cache check, then for
//! each attempt a concurrency permit, a rate-limit token and the HTTP call under
//! a hard timeout; transient failures back off and retry. When retries are spent
//! a stale cache entry, if any, is served instead of failing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::HeaderMap;
use reqwest_retry::{default_on_request_success, Retryable};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, Semaphore};

use crate::cache::{CacheLookup, Params, ResponseCache};
use crate::error::{classify_status, FetchError, FetchErrorKind};
use crate::http::{ExponentialBackoff, HttpClientBuilder};
use crate::jobs::{JobGuard, JobStatus, JobTracker};
use crate::rate_limiter::RateLimiter;

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Token bucket burst size.
    pub rate_limit_capacity: u32,
    /// Token bucket refill rate (tokens per second).
    pub rate_limit_per_second: f64,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Hard timeout for a single attempt (connect, headers and body).
    pub fetch_timeout: Duration,
    /// Upper bound on simultaneously running fetches.
    pub max_concurrent_fetches: usize,
    /// Finished jobs retained for diagnostics.
    pub job_history_limit: usize,
    /// Responses kept for fresh and stale serving; least recently used go first.
    pub cache_capacity: usize,
    /// Overrides the default `legislative-ingest/<version>` user agent.
    pub user_agent: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            rate_limit_capacity: 5,
            rate_limit_per_second: 2.0,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 4,
            job_history_limit: 1000,
            cache_capacity: 512,
            user_agent: None,
        }
    }
}

/// Successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub payload: Value,
    pub from_cache: bool,
    /// Served from an expired cache entry because the upstream failed.
    pub stale: bool,
    pub job_id: String,
    /// Network attempts made (zero for a fresh cache hit).
    pub attempts: u32,
}

/// Executor counters, for dashboards and the routing cost model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchStatistics {
    pub total_requests: u64,
    pub network_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub cache_hits: u64,
    pub stale_served: u64,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
}

#[derive(Default)]
struct Counters {
    total_requests: AtomicU64,
    network_calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
    stale_served: AtomicU64,
}

/// Per-key locks so concurrent fetches of one request share a single network call.
#[derive(Default)]
struct InFlight {
    keys: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    async fn enter(&self, key: &str) -> InFlightGuard<'_> {
        let lock = self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone();
        let held = lock.clone().lock_owned().await;
        InFlightGuard {
            owner: self,
            key: key.to_string(),
            lock,
            _held: held,
        }
    }
}

struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
    lock: Arc<AsyncMutex<()>>,
    _held: OwnedMutexGuard<()>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys.lock().unwrap_or_else(PoisonError::into_inner);
        // The map, this guard and the held lock; anything more is a waiter.
        if Arc::strong_count(&self.lock) <= 3 {
            keys.remove(&self.key);
        }
    }
}

pub struct FetchExecutor {
    client: reqwest::Client,
    config: ExecutorConfig,
    limiter: RateLimiter,
    cache: ResponseCache,
    jobs: JobTracker,
    policy: ExponentialBackoff,
    permits: Semaphore,
    in_flight: InFlight,
    counters: Counters,
}

impl FetchExecutor {
    /// Create an executor with a default HTTP client.
    pub fn new(config: ExecutorConfig) -> Result<Self, FetchError> {
        let mut builder = HttpClientBuilder::new();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.with_user_agent(user_agent.clone());
        }
        let client = builder.build()?;
        Ok(Self::with_client(config, client))
    }

    /// Create an executor around a pre-built client (e.g. a custom user agent or proxy).
    pub fn with_client(config: ExecutorConfig, client: reqwest::Client) -> Self {
        let policy = ExponentialBackoff::new(
            config.max_retries,
            config.retry_base_delay,
            config.retry_max_delay,
        );
        Self {
            client,
            limiter: RateLimiter::new(config.rate_limit_capacity, config.rate_limit_per_second),
            cache: ResponseCache::new(config.cache_capacity),
            jobs: JobTracker::new(config.job_history_limit),
            policy,
            permits: Semaphore::new(config.max_concurrent_fetches.max(1)),
            in_flight: InFlight::default(),
            counters: Counters::default(),
            config,
        }
    }

    /// GET `url` with `params`, returning a JSON payload.
    ///
    /// Fresh cache entries are returned without touching the rate limiter or the
    /// network. Successful responses are cached for `cache_ttl`.
    pub async fn fetch(
        &self,
        url: &str,
        params: &Params,
        cache_ttl: Duration,
    ) -> Result<FetchResult, FetchError> {
        self.fetch_with_headers(url, params, cache_ttl, &HeaderMap::new())
            .await
    }

    /// Like [`fetch`](Self::fetch), sending extra `headers` (e.g. credentials).
    /// Headers are not part of the cache key.
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        params: &Params,
        cache_ttl: Duration,
        headers: &HeaderMap,
    ) -> Result<FetchResult, FetchError> {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);
        let key = ResponseCache::key_for(url, params);
        let guard = JobGuard::new(self.jobs.clone(), self.jobs.create(url));
        let job_id = guard.job_id().to_string();
        // A concurrent fetch of the same request finishes first and fills the cache.
        let _in_flight = self.in_flight.enter(&key).await;

        if let Some(payload) = self.cache.get_fresh(&key) {
            debug!("Cache hit for {} (job {})", url, job_id);
            self.jobs.mark_cached(&job_id);
            self.jobs.transition(&job_id, JobStatus::Succeeded);
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            self.counters.successes.fetch_add(1, Ordering::Relaxed);
            return Ok(FetchResult {
                payload,
                from_cache: true,
                stale: false,
                job_id,
                attempts: 0,
            });
        }

        let mut attempts = 0;
        let error = loop {
            attempts += 1;
            match self.attempt(&job_id, url, params, headers).await {
                Ok(payload) => {
                    self.cache.put(key, payload.clone(), cache_ttl);
                    self.jobs.transition(&job_id, JobStatus::Succeeded);
                    self.counters.successes.fetch_add(1, Ordering::Relaxed);
                    debug!("Fetched {} in {} attempt(s)", url, attempts);
                    return Ok(FetchResult {
                        payload,
                        from_cache: false,
                        stale: false,
                        job_id,
                        attempts,
                    });
                }
                Err(err) => {
                    self.jobs.record_error(&job_id, &err.to_string());
                    let delay = if err.is_transient() {
                        self.policy.next_delay(attempts - 1)
                    } else {
                        None
                    };
                    let Some(delay) = delay else {
                        break err;
                    };
                    warn!(
                        "Fetch of {} failed ({}), retrying in {:?} (attempt {}/{})",
                        url,
                        err.kind,
                        delay,
                        attempts,
                        self.policy.max_retries() + 1
                    );
                    self.jobs.transition(&job_id, JobStatus::Retrying);
                    tokio::time::sleep(delay).await;
                }
            }
        };

        if error.is_transient() {
            if let CacheLookup::Stale(payload) = self.cache.lookup(&key) {
                warn!(
                    "Serving stale cached response for {} after {}",
                    url, error.kind
                );
                self.jobs.mark_cached(&job_id);
                self.jobs.transition(&job_id, JobStatus::Succeeded);
                self.counters.stale_served.fetch_add(1, Ordering::Relaxed);
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                return Ok(FetchResult {
                    payload,
                    from_cache: true,
                    stale: true,
                    job_id,
                    attempts,
                });
            }
        }

        info!("Giving up on {} after {} attempt(s): {}", url, attempts, error);
        self.jobs.transition(&job_id, JobStatus::Failed);
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
        Err(FetchError { attempts, ..error })
    }

    /// One network attempt, bounded by the concurrency limit, the rate limiter and the timeout.
    async fn attempt(
        &self,
        job_id: &str,
        url: &str,
        params: &Params,
        headers: &HeaderMap,
    ) -> Result<Value, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Builder, 0).with_source(e))?;
        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            debug!(
                "Waited {:?} for a rate limit token ({:.2} left)",
                waited,
                self.limiter.state().tokens
            );
        }
        self.jobs.transition(job_id, JobStatus::Running);
        self.counters.network_calls.fetch_add(1, Ordering::Relaxed);

        let request = async {
            let response = self
                .client
                .get(url)
                .headers(headers.clone())
                .query(params)
                .send()
                .await?;
            let status = response.status().as_u16();
            match default_on_request_success(&response) {
                None => {}
                Some(Retryable::Transient) => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(FetchError::new(classify_status(status), 0).with_source(body));
                }
                Some(Retryable::Fatal) => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(FetchError::new(FetchErrorKind::Client(status), 0).with_source(body));
                }
            }
            let payload: Value = response.json().await?;
            Ok::<Value, FetchError>(payload)
        };

        match tokio::time::timeout(self.config.fetch_timeout, request).await {
            Ok(result) => result,
            Err(elapsed) => Err(FetchError::new(FetchErrorKind::Timeout, 0).with_source(elapsed)),
        }
    }

    pub fn statistics(&self) -> FetchStatistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let total_requests = load(&self.counters.total_requests);
        let successes = load(&self.counters.successes);
        let cache_hits = load(&self.counters.cache_hits);
        let ratio = |n: u64| {
            if total_requests == 0 {
                0.0
            } else {
                n as f64 / total_requests as f64
            }
        };

        FetchStatistics {
            total_requests,
            network_calls: load(&self.counters.network_calls),
            successes,
            failures: load(&self.counters.failures),
            cache_hits,
            stale_served: load(&self.counters.stale_served),
            success_rate: ratio(successes),
            cache_hit_rate: ratio(cache_hits),
        }
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Drop the cached response for `url` and `params` so the next fetch goes to the network.
    pub fn invalidate(&self, url: &str, params: &Params) -> bool {
        self.cache.remove(&ResponseCache::key_for(url, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn test_config() -> ExecutorConfig {
        ExecutorConfig {
            rate_limit_capacity: 100,
            rate_limit_per_second: 100.0,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(10),
            retry_max_delay: Duration::from_millis(40),
            fetch_timeout: Duration::from_millis(500),
            max_concurrent_fetches: 4,
            job_history_limit: 100,
            cache_capacity: 64,
            user_agent: Some("legislative-ingest-tests".to_string()),
        }
    }

    fn date_params(date: &str) -> Params {
        let mut params = Params::new();
        params.insert("date".to_string(), date.to_string());
        params
    }

    fn history(executor: &FetchExecutor, job_id: &str) -> Vec<JobStatus> {
        executor
            .jobs()
            .get(job_id)
            .unwrap()
            .history
            .iter()
            .map(|t| t.status)
            .collect()
    }

    #[tokio::test]
    async fn test_identical_fetches_within_ttl_hit_network_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::UrlEncoded(
                "date".into(),
                "2024-06-01".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"meetings": []}"#)
            .expect(1)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());
        let params = date_params("2024-06-01");

        let first = executor
            .fetch(&url, &params, Duration::from_secs(60))
            .await
            .unwrap();
        let second = executor
            .fetch(&url, &params, Duration::from_secs(60))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.attempts, 0);
        assert_eq!(second.payload, json!({"meetings": []}));
        assert_eq!(
            history(&executor, &second.job_id),
            vec![JobStatus::Pending, JobStatus::Succeeded]
        );

        let stats = executor.statistics();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.network_calls, 1);
        assert_eq!(stats.cache_hits, 1);
        assert!((stats.cache_hit_rate - 0.5).abs() < f64::EPSILON);
        assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_headers_are_sent_but_not_part_of_cache_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/transcripts")
            .match_query(mockito::Matcher::Any)
            .match_header("authorization", "key_123")
            .with_status(200)
            .with_body(r#"{"transcripts": []}"#)
            .expect(1)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/transcripts", server.url());
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "key_123".parse().unwrap());

        executor
            .fetch_with_headers(&url, &Params::new(), Duration::from_secs(60), &headers)
            .await
            .unwrap();
        let cached = executor
            .fetch(&url, &Params::new(), Duration::from_secs(60))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(cached.from_cache);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_until_budget_spent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());

        let err = executor
            .fetch(&url, &date_params("2024-06-01"), Duration::from_secs(60))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, FetchErrorKind::Upstream(503));
        assert_eq!(err.attempts, 3);

        let job = executor.jobs().snapshot().pop().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempt_count, 3);
        assert_eq!(
            history(&executor, &job.job_id),
            vec![
                JobStatus::Pending,
                JobStatus::Running,
                JobStatus::Retrying,
                JobStatus::Running,
                JobStatus::Retrying,
                JobStatus::Running,
                JobStatus::Failed
            ]
        );
        assert_eq!(executor.statistics().failures, 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());

        let err = executor
            .fetch(&url, &Params::new(), Duration::from_secs(60))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, FetchErrorKind::Client(404));
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn test_throttling_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());

        let err = executor
            .fetch(&url, &Params::new(), Duration::from_secs(60))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, FetchErrorKind::Throttled);
    }

    #[tokio::test]
    async fn test_malformed_body_fails_without_retry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .expect(1)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());

        let err = executor
            .fetch(&url, &Params::new(), Duration::from_secs(60))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, FetchErrorKind::Malformed);
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_served_when_upstream_down() {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"meetings": [{"meeting_id": "m1"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());
        let params = date_params("2024-06-01");

        // Zero TTL: the entry is stored but immediately stale.
        executor.fetch(&url, &params, Duration::ZERO).await.unwrap();
        ok.assert_async().await;
        ok.remove_async().await;

        let down = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let result = executor.fetch(&url, &params, Duration::ZERO).await.unwrap();

        down.assert_async().await;
        assert!(result.from_cache);
        assert!(result.stale);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.payload["meetings"][0]["meeting_id"], "m1");
        assert_eq!(executor.statistics().stale_served, 1);
        assert!(executor.jobs().get(&result.job_id).unwrap().cached);
    }

    #[tokio::test]
    async fn test_hung_upstream_times_out_and_is_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ExecutorConfig {
            fetch_timeout: Duration::from_millis(100),
            ..test_config()
        };
        let executor = FetchExecutor::new(config).unwrap();

        let err = executor
            .fetch(&format!("http://{addr}/transcripts"), &Params::new(), Duration::from_secs(60))
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Timeout);
        assert_eq!(err.attempts, 3);
        assert_eq!(executor.statistics().network_calls, 3);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_leaves_failed_job() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ExecutorConfig {
            fetch_timeout: Duration::from_secs(30),
            ..test_config()
        };
        let executor = FetchExecutor::new(config).unwrap();
        let url = format!("http://{addr}/transcripts");

        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            executor.fetch(&url, &Params::new(), Duration::from_secs(60)),
        )
        .await;

        assert!(outcome.is_err());
        let job = executor.jobs().snapshot().pop().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.last_error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_concurrent_identical_fetches_share_one_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .match_header("user-agent", "legislative-ingest-tests")
            .with_status(200)
            .with_body(r#"{"meetings": []}"#)
            .expect(1)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());
        let params = date_params("2024-06-03");

        let (first, second) = tokio::join!(
            executor.fetch(&url, &params, Duration::from_secs(60)),
            executor.fetch(&url, &params, Duration::from_secs(60)),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        mock.assert_async().await;
        assert_ne!(first.from_cache, second.from_cache);
        assert_eq!(executor.statistics().network_calls, 1);
        assert!(executor.in_flight.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalidated_entry_is_fetched_again() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/meetings")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"meetings": []}"#)
            .expect(2)
            .create_async()
            .await;

        let executor = FetchExecutor::new(test_config()).unwrap();
        let url = format!("{}/meetings", server.url());
        let params = date_params("2024-06-04");

        executor.fetch(&url, &params, Duration::from_secs(60)).await.unwrap();
        assert!(executor.invalidate(&url, &params));
        let again = executor.fetch(&url, &params, Duration::from_secs(60)).await.unwrap();

        mock.assert_async().await;
        assert!(!again.from_cache);
        assert!(!executor.invalidate(&url, &date_params("2024-06-05")));
    }

    #[tokio::test]
    async fn test_running_fetches_are_capped() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ExecutorConfig {
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 2,
            ..test_config()
        };
        let executor = Arc::new(FetchExecutor::new(config).unwrap());

        let mut handles = Vec::new();
        for day in 1..=5 {
            let executor = Arc::clone(&executor);
            let url = format!("http://{addr}/transcripts");
            handles.push(tokio::spawn(async move {
                let params = date_params(&format!("2024-06-0{day}"));
                executor.fetch(&url, &params, Duration::from_secs(60)).await
            }));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let counts = executor.jobs().counts_by_status();
        assert_eq!(counts.get(&JobStatus::Running), Some(&2));
        assert_eq!(counts.get(&JobStatus::Pending), Some(&3));

        for handle in handles {
            handle.abort();
        }
    }
}
