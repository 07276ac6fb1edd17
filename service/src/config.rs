use chrono::NaiveDate;
use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default base URL of the structured archive API.
pub const DEFAULT_HISTORICAL_BASE_URL: &str = "https://open.assembly.go.kr/portal/openapi";
/// Default base URL of the transcription service.
pub const DEFAULT_REALTIME_BASE_URL: &str = "https://api.assemblyai.com/v2";
/// First day of the session whose records are not yet archived.
pub const DEFAULT_SESSION_CUTOFF_DATE: &str = "2024-05-30";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the structured archive API (finalized sessions).
    #[arg(long, env, default_value = DEFAULT_HISTORICAL_BASE_URL)]
    historical_base_url: String,

    /// Base URL of the transcription service (current session).
    #[arg(long, env, default_value = DEFAULT_REALTIME_BASE_URL)]
    realtime_base_url: String,

    /// The API key to send as the `authorization` header to the transcription service.
    #[arg(long, env)]
    realtime_api_key: Option<String>,

    /// Meetings strictly before this date are served by the archive API,
    /// meetings on or after it by the transcription service.
    #[arg(long, env, default_value = DEFAULT_SESSION_CUTOFF_DATE)]
    pub session_cutoff_date: NaiveDate,

    /// Days after the cutoff during which routing confidence is reduced.
    #[arg(long, env, default_value_t = 7)]
    pub grace_window_days: u32,

    /// Routing confidence reported on the cutoff day itself.
    #[arg(long, env, default_value_t = 0.6)]
    pub min_edge_confidence: f64,

    /// Let a forced source fall back to the other source when it fails.
    #[arg(long, env, default_value_t = false)]
    pub allow_forced_fallback: bool,

    /// Token bucket burst size for outbound requests
    #[arg(long, env, default_value_t = 5)]
    pub rate_limit_capacity: u32,

    /// Outbound requests per second once the burst is spent
    #[arg(long, env, default_value_t = 2.0)]
    pub rate_limit_per_second: f64,

    /// Seconds a cached upstream response stays fresh
    #[arg(long, env, default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    /// Most upstream responses kept in the cache; the least recently used is evicted
    #[arg(long, env, default_value_t = 512)]
    pub cache_capacity: usize,

    /// User-Agent header sent with every outbound request
    #[arg(long, env)]
    pub http_user_agent: Option<String>,

    /// Retries after the first attempt for transient failures
    #[arg(long, env, default_value_t = 3)]
    pub max_retries: u32,

    /// Backoff before the first retry, doubled for each further retry
    #[arg(long, env, default_value_t = 1000)]
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single backoff delay
    #[arg(long, env, default_value_t = 60000)]
    pub retry_max_delay_ms: u64,

    /// Hard timeout in seconds for a single fetch attempt
    #[arg(long, env, default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Maximum number of fetches running at once
    #[arg(long, env, default_value_t = 4)]
    pub max_concurrent_fetches: usize,

    /// Finished fetch jobs kept for diagnostics
    #[arg(long, env, default_value_t = 1000)]
    pub job_history_limit: usize,

    /// Cost of one request served by the transcription service, for capacity planning
    #[arg(long, env, default_value_t = 0.25)]
    pub realtime_unit_cost: f64,

    /// Overall deadline in seconds for one routed ingestion, fallback included
    #[arg(long, env)]
    pub ingest_deadline_secs: Option<u64>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn historical_base_url(&self) -> &str {
        &self.historical_base_url
    }

    pub fn realtime_base_url(&self) -> &str {
        &self.realtime_base_url
    }

    /// Returns the transcription service API key, if configured.
    pub fn realtime_api_key(&self) -> Option<String> {
        self.realtime_api_key.clone()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = Config::parse_from(["legislative_ingest"]);

        assert_eq!(
            config.session_cutoff_date,
            NaiveDate::from_ymd_opt(2024, 5, 30).unwrap()
        );
        assert_eq!(config.grace_window_days, 7);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_limit_capacity, 5);
        assert_eq!(config.cache_capacity, 512);
        assert!(config.http_user_agent.is_none());
        assert!(!config.allow_forced_fallback);
        assert!(config.ingest_deadline_secs.is_none());
        assert_eq!(config.historical_base_url(), DEFAULT_HISTORICAL_BASE_URL);
        assert_eq!(config.log_level_filter, LevelFilter::Info);
        assert!(!config.is_production());
    }

    #[test]
    #[serial]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "legislative_ingest",
            "--session-cutoff-date",
            "2020-05-30",
            "--allow-forced-fallback",
            "--ingest-deadline-secs",
            "45",
            "--runtime-env",
            "PRODUCTION",
            "--cache-capacity",
            "32",
            "--http-user-agent",
            "ingest-bot/1.0",
        ]);

        assert_eq!(
            config.session_cutoff_date,
            NaiveDate::from_ymd_opt(2020, 5, 30).unwrap()
        );
        assert!(config.allow_forced_fallback);
        assert_eq!(config.ingest_deadline_secs, Some(45));
        assert!(config.is_production());
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.http_user_agent.as_deref(), Some("ingest-bot/1.0"));
    }

    #[test]
    #[serial]
    fn test_environment_is_read() {
        env::set_var("REALTIME_API_KEY", "key_123");
        env::set_var("MAX_RETRIES", "5");

        let config = Config::parse_from(["legislative_ingest"]);

        env::remove_var("REALTIME_API_KEY");
        env::remove_var("MAX_RETRIES");

        assert_eq!(config.realtime_api_key().as_deref(), Some("key_123"));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_invalid_cutoff_date_is_rejected() {
        let result =
            Config::try_parse_from(["legislative_ingest", "--session-cutoff-date", "30/05/2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rust_env_parse() {
        assert_eq!("Staging".parse(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
