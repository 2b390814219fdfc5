use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::api::ServerSettings;
use crate::engine::{IdempotencySettings, PipelineSettings, RetryPolicy};
use crate::models::ValidationRules;
use crate::query::{IbanMatchMode, QuerySettings};
use crate::scoring::{BlendedScorer, FraudScorer, HeuristicScorer, HttpScorer};
use crate::types::Probability;

/// Fraud alert service: batch ingestion of bank transactions and alert queries.
#[derive(Debug, Parser)]
#[command(name = "fraud-alerts", version)]
pub struct Cli {
    #[arg(long, env = "FRAUD_ALERTS_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Run one batch file through the pipeline and print the alerts it raises as CSV.
    Ingest(IngestArgs)
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "FRAUD_ALERTS_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "FRAUD_ALERTS_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Disable the permissive CORS layer used by browser dashboards.
    #[arg(long, env = "FRAUD_ALERTS_NO_CORS")]
    pub no_cors: bool,

    #[arg(long, env = "FRAUD_ALERTS_REQUEST_TIMEOUT_MS", default_value_t = 120_000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = "FRAUD_ALERTS_BODY_LIMIT_BYTES", default_value_t = 32 * 1024 * 1024)]
    pub body_limit_bytes: usize,

    #[arg(long, env = "FRAUD_ALERTS_IBAN_MATCH", value_enum, default_value_t = IbanMatchMode::Exact)]
    pub iban_match: IbanMatchMode,

    #[arg(long, env = "FRAUD_ALERTS_PAGE_SIZE", default_value_t = 500)]
    pub page_size: usize,

    #[arg(long, env = "FRAUD_ALERTS_MAX_PAGE_SIZE", default_value_t = 5_000)]
    pub max_page_size: usize,

    #[command(flatten)]
    pub engine: EngineArgs
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON file shaped like the upload body: `{ "transacciones": [...] }`.
    pub path: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Minimum score at which an alert is created.
    #[arg(long, env = "FRAUD_ALERTS_ALERT_THRESHOLD", default_value = "0.5", value_parser = parse_probability)]
    pub alert_threshold: Probability,

    /// Remote scorer endpoint. Repeat (or comma-separate) to blend several models.
    /// Without one the built-in heuristic scorer is used.
    #[arg(long = "scorer-url", env = "FRAUD_ALERTS_SCORER_URLS", value_delimiter = ',')]
    pub scorer_urls: Vec<String>,

    #[arg(long, env = "FRAUD_ALERTS_SCORER_TIMEOUT_MS", default_value_t = 5_000)]
    pub scorer_timeout_ms: u64,

    #[arg(long, env = "FRAUD_ALERTS_STORE_TIMEOUT_MS", default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "FRAUD_ALERTS_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    #[arg(long, env = "FRAUD_ALERTS_BACKOFF_MS", default_value_t = 50)]
    pub backoff_ms: u64,

    /// Records of one batch scored concurrently.
    #[arg(long, env = "FRAUD_ALERTS_CONCURRENCY", default_value_t = 16)]
    pub concurrency: usize,

    /// Skip transaction codes already seen within this many seconds. Off when unset.
    #[arg(long, env = "FRAUD_ALERTS_IDEMPOTENCY_WINDOW_SECS")]
    pub idempotency_window_secs: Option<u64>,

    #[arg(long, env = "FRAUD_ALERTS_IDEMPOTENCY_CAPACITY", default_value_t = 1_000_000)]
    pub idempotency_capacity: u64,

    /// Check IBAN layout only, for anonymised feeds without valid checksums.
    #[arg(long, env = "FRAUD_ALERTS_SKIP_IBAN_CHECKSUM")]
    pub skip_iban_checksum: bool,

    /// JSON file of per-account preferences: `{ "<IBAN>": { "notificaciones", "umbral" } }`.
    #[arg(long, env = "FRAUD_ALERTS_PREFERENCES")]
    pub preferences: Option<PathBuf>
}

fn parse_probability(value: &str) -> Result<Probability, String> {
    value.parse::<Probability>().map_err(|error| error.to_string())
}

impl EngineArgs {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            alert_threshold: self.alert_threshold,
            concurrency: self.concurrency.max(1),
            scorer_timeout: Duration::from_millis(self.scorer_timeout_ms),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                backoff: Duration::from_millis(self.backoff_ms)
            },
            validation: ValidationRules {
                verify_iban_checksum: !self.skip_iban_checksum
            },
            idempotency: self.idempotency_window_secs.map(|seconds| IdempotencySettings {
                window: Duration::from_secs(seconds),
                capacity: self.idempotency_capacity
            })
        }
    }

    pub fn build_scorer(&self) -> Result<Arc<dyn FraudScorer>> {
        let timeout = Duration::from_millis(self.scorer_timeout_ms);

        let mut members = self.scorer_urls.iter()
            .map(|url| {
                HttpScorer::new(url.clone(), timeout)
                    .map(|scorer| Arc::new(scorer) as Arc<dyn FraudScorer>)
                    .with_context(|| format!("Could not build scorer client for {url}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let scorer: Arc<dyn FraudScorer> = match members.len() {
            0 => Arc::new(HeuristicScorer::new()),
            1 => members.remove(0),
            _ => Arc::new(BlendedScorer::new(members))
        };

        Ok(scorer)
    }
}

impl ServeArgs {
    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            address: SocketAddr::new(self.host, self.port),
            enable_cors: !self.no_cors,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            body_limit: self.body_limit_bytes
        }
    }

    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            iban_match: self.iban_match,
            page_size: self.page_size.max(1),
            max_page_size: self.max_page_size.max(1)
        }
    }
}
