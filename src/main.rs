mod api;
mod config;
mod engine;
mod models;
mod preferences;
mod query;
mod scoring;
mod storage;
#[cfg(test)]
mod testing;
mod types;

use std::io::{stderr, stdout, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::api::{create_router, run_server, AppState};
use crate::config::{Cli, Command, EngineArgs, IngestArgs, ServeArgs};
use crate::engine::IngestionPipeline;
use crate::models::Alert;
use crate::preferences::PreferenceBook;
use crate::query::{AlertQueryService, ListRequest, QuerySettings};
use crate::storage::{AlertStorage, AlertStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.into());

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Ingest(args) => ingest(args).await
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let store: Arc<dyn AlertStore> = Arc::new(AlertStorage::new());
    let pipeline = Arc::new(build_pipeline(&args.engine, store.clone()).await?);
    let queries = Arc::new(AlertQueryService::new(store, args.query_settings()));

    let settings = args.server_settings();
    let router = create_router(AppState::new(pipeline, queries), &settings);
    let listener = TcpListener::bind(settings.address).await
        .with_context(|| format!("Could not bind {}", settings.address))?;

    run_server(router, listener).await
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let body = read_file(args.path).await?;

    let store: Arc<dyn AlertStore> = Arc::new(AlertStorage::new());
    let pipeline = build_pipeline(&args.engine, store.clone()).await?;

    let timer = Instant::now();
    let summary = pipeline.ingest_slice(&body).await?;
    let duration = timer.elapsed();

    info!("Processed batch in: {duration:?}");
    eprintln!("{}", serde_json::to_string(&summary)?);

    //NOTE: The whole run fits in one process, so the listing is not paginated.
    let queries = AlertQueryService::new(store, QuerySettings {
        page_size: usize::MAX,
        max_page_size: usize::MAX,
        ..QuerySettings::default()
    });
    let alerts = queries.list(&ListRequest::default()).await?;

    write_results_to_stdout(&alerts)
}

async fn build_pipeline(engine: &EngineArgs, store: Arc<dyn AlertStore>) -> Result<IngestionPipeline> {
    let scorer = engine.build_scorer()?;
    info!("Scoring with the '{}' scorer", scorer.name());

    let preferences = match &engine.preferences {
        Some(path) => {
            let body = read_file(path.clone()).await?;
            PreferenceBook::from_json(&body)
                .with_context(|| format!("Invalid preferences file '{}'", path.display()))?
        }
        None => PreferenceBook::new()
    };

    Ok(IngestionPipeline::new(scorer, store, engine.pipeline_settings())
        .with_preferences(Arc::new(preferences)))
}

async fn read_file(path: PathBuf) -> Result<Vec<u8>> {
    let display = path.display().to_string();

    //NOTE: std::fs is blocking, keep it off the runtime workers
    let body = spawn_blocking(move || std::fs::read(path)).await?
        .with_context(|| format!("Could not read '{display}'"))?;

    Ok(body)
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the ingest CSV, every log line goes to stderr
    let terminal_log = fmt::layer()
        .with_writer(stderr)
        .with_ansi(stderr().is_terminal())
        .with_target(level >= LevelFilter::DEBUG)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn write_results_to_stdout(alerts: &[Alert]) -> Result<()> {
    let mut output = csv::Writer::from_writer(BufWriter::new(stdout().lock()));

    output.write_record(["IBAN", "codigo_transaccion", "importe", "umbral_probabilistico", "IBAN_empresa_cobradora", "severidad"])?;

    for alert in alerts {
        let amount = alert.amount.to_string();
        let probability = alert.probability.to_string();
        let severity = alert.severity().to_string();

        output.write_record([
            alert.iban.as_str(),
            alert.transaction_code.as_str(),
            amount.as_str(),
            probability.as_str(),
            alert.collector_iban.as_deref().unwrap_or_default(),
            severity.as_str()
        ])?;
    }

    output.into_inner()
        .map_err(|error| anyhow::anyhow!("Could not flush alert output: {}", error.error()))?
        .flush()?;

    Ok(())
}
