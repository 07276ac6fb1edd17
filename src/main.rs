use chrono::{Days, NaiveDate};
use clap::Parser;
use domain::router::IngestionRouter;
use domain::routing::{self, IngestionRequest, RoutingConfig, RoutingDecision};
use domain::sink::{JsonLinesSink, RecordSink};
use domain::{DataSource, IngestionResult};
use dotenvy::dotenv;
use log::*;
use serde::Serialize;
use service::{config::Config, logging::Logger};
use std::io::BufWriter;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Debug, Parser)]
#[command(version, about = "Ingest legislative session records from the archive or live transcription")]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// First meeting date to ingest (YYYY-MM-DD).
    #[arg(long)]
    meeting_date: NaiveDate,

    /// Number of consecutive days to ingest, starting at `--meeting-date`.
    #[arg(long, default_value_t = 1)]
    days: u32,

    #[arg(long)]
    session_number: Option<u32>,

    /// Skip routing and use this source (`historical` or `realtime`).
    #[arg(long)]
    force_source: Option<DataSource>,

    /// Print the routing decision for each date without fetching anything.
    #[arg(long)]
    decide_only: bool,
}

#[derive(Serialize)]
struct DecisionLine<'a> {
    request: &'a IngestionRequest,
    decision: RoutingDecision,
}

fn build_requests(cli: &Cli) -> Vec<IngestionRequest> {
    (0..cli.days.max(1))
        .filter_map(|offset| cli.meeting_date.checked_add_days(Days::new(offset.into())))
        .map(|date| {
            let mut request = IngestionRequest::new(date);
            request.session_number = cli.session_number;
            request.force_source = cli.force_source;
            request
        })
        .collect()
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|e| {
        error!("Failed to serialize output: {e}");
        String::new()
    })
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();
    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let requests = build_requests(&cli);

    if cli.decide_only {
        let routing_config = RoutingConfig::from(&cli.config);
        for request in &requests {
            let line = DecisionLine {
                request,
                decision: routing::decide(request, &routing_config),
            };
            println!("{}", to_json(&line, false));
        }
        return;
    }

    let router = match IngestionRouter::from_config(&cli.config) {
        Ok(router) => Arc::new(router),
        Err(e) => {
            error!("Failed to set up ingestion: {e}");
            std::process::exit(1);
        }
    };

    info!("Ingesting {} meeting date(s)", requests.len());

    let mut tasks = JoinSet::new();
    for request in requests {
        let router = router.clone();
        tasks.spawn(async move {
            let result = router.ingest(&request).await;
            (request, result)
        });
    }

    let mut results: Vec<(IngestionRequest, IngestionResult)> = Vec::new();
    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => results.push(outcome),
            Err(e) => {
                error!("Ingestion task panicked: {e}");
                failures += 1;
            }
        }
    }
    results.sort_by_key(|(request, _)| request.meeting_date);

    let mut sink = JsonLinesSink::new(BufWriter::new(std::io::stdout()));
    for (request, result) in &results {
        for warning in &result.warnings {
            warn!("{}: {}", request.meeting_date, warning);
        }
        if !result.success {
            failures += 1;
            for err in &result.errors {
                error!("{}: {}", request.meeting_date, err);
            }
            continue;
        }
        info!(
            "{}: {} meeting(s), {} speech(es) from {} in {:.2}s",
            request.meeting_date,
            result.meeting_count,
            result.speech_count,
            result.data_source,
            result.processing_time_seconds
        );
        if let Err(e) = sink.write_records(&result.meetings, &result.speeches).await {
            error!("Failed to write records for {}: {e}", request.meeting_date);
            failures += 1;
        }
    }

    eprintln!("{}", to_json(&router.get_routing_statistics(), true));

    if failures > 0 {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_consecutive_days() {
        let cli = Cli::parse_from([
            "legislative_ingest",
            "--meeting-date",
            "2024-05-29",
            "--days",
            "3",
            "--force-source",
            "realtime",
        ]);

        let requests = build_requests(&cli);

        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[2].meeting_date,
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
        assert!(requests
            .iter()
            .all(|r| r.force_source == Some(DataSource::Realtime)));
    }

    #[test]
    fn zero_days_still_ingests_the_given_date() {
        let cli = Cli::parse_from([
            "legislative_ingest",
            "--meeting-date",
            "2024-03-05",
            "--days",
            "0",
            "--session-number",
            "413",
        ]);

        let requests = build_requests(&cli);

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].session_number, Some(413));
    }
}
