//! Application entry point for `openaq-harvest`.
//!
//! This binary runs one bounded extraction:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Normalizing the requested date range once
//! - Building the API client handle shared by every collection
//! - Opening the selected output sink (creating the table for Postgres)
//! - Collecting and writing each sensor or location in order
//!
//! # Environment Variables
//! - `OPENAQ_API_KEY` (**required**) – API key for the measurement service
//! - `DATABASE_URL` (required for `--sink postgres`) – PostgreSQL connection string
//! - `AQ_LOG_LEVEL` (optional) – log verbosity for this crate (default: `info`)
//! - `AQ_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config` for the remaining tunables.
use std::{env, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use openaq_harvest::{
    batch, config, schema, Collector, CsvSink, DateRange, OpenAqClient, PostgresSink, Sink,
    WorkUnit,
};

// ---

#[derive(Debug, Parser)]
#[command(name = "openaq-harvest")]
#[command(about = "Fetch daily air-quality measurements into CSV or PostgreSQL")]
struct Cli {
    /// Log at debug level for this crate (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect one table per sensor ID.
    Sensors {
        #[arg(required = true)]
        ids: Vec<i64>,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Resolve each location to its sensors and collect one table per location.
    Locations {
        #[arg(required = true)]
        ids: Vec<i64>,
        #[command(flatten)]
        opts: RunOpts,
    },
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Start of the range, e.g. "1/1/2023", "2023-01-01" or "January 1, 2023".
    #[arg(long, env = "AQ_DATE_FROM", default_value = "2020-01-01")]
    from: String,

    /// End of the range, same formats as --from.
    #[arg(long, env = "AQ_DATE_TO", default_value = "2025-01-01")]
    to: String,

    #[arg(long, value_enum, default_value_t = SinkKind::Csv)]
    sink: SinkKind,

    /// Directory for CSV output.
    #[arg(long, default_value = "sensor_data")]
    out_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    Csv,
    Postgres,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (units, opts) = match cli.command {
        Commands::Sensors { ids, opts } => (ids.into_iter().map(WorkUnit::Sensor).collect::<Vec<_>>(), opts),
        Commands::Locations { ids, opts } => (ids.into_iter().map(WorkUnit::Location).collect(), opts),
    };

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let range = DateRange::parse(Some(opts.from.as_str()), Some(opts.to.as_str()))?;
    tracing::info!("Date range: {}", range);

    let client = OpenAqClient::with_base_url(&cfg.api_key, u64::from(cfg.api_timeout_secs), &cfg.api_url)
        .context("Failed to build API client")?;
    let collector = Collector::new(&client)
        .with_page_size(cfg.api_page_size)
        .with_max_pages(cfg.api_max_pages);

    let sink = match opts.sink {
        SinkKind::Csv => Sink::Csv(CsvSink::new(opts.out_dir)),
        SinkKind::Postgres => {
            let db_url = cfg
                .db_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL must be set for the postgres sink"))?;

            let pool = PgPoolOptions::new()
                .max_connections(cfg.db_pool_max)
                .connect(db_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Successfully connected to database");

            schema::create_schema(&pool).await?;
            Sink::Postgres(PostgresSink::new(pool))
        }
    };

    let summary = batch::run(&collector, &sink, &units, &range).await;
    tracing::info!(
        "Run {} complete: {}/{} units written",
        summary.run_id,
        summary.successful + summary.partial,
        summary.total()
    );

    Ok(())
}

// ---

/// Install the global tracing subscriber.
///
/// Dependencies log at `warn`; only this crate follows `AQ_LOG_LEVEL`
/// (default `info`, `debug` with `--verbose`). A set `RUST_LOG` replaces the
/// whole filter. `AQ_SPAN_EVENTS=full|enter_exit` adds span events beyond the
/// closing one that times each batch, and `FORCE_COLOR` overrides TTY
/// detection.
fn init_tracing(verbose: bool) {
    // ---
    let span_events = match env::var("AQ_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    let directive = filter_directive(
        env::var("RUST_LOG").ok().as_deref(),
        env::var("AQ_LOG_LEVEL").ok().as_deref(),
        verbose,
    );

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(span_events)
        .with_env_filter(EnvFilter::new(directive))
        .with_ansi(use_color)
        .init();
}

/// Filter directive for the subscriber.
fn filter_directive(rust_log: Option<&str>, level: Option<&str>, verbose: bool) -> String {
    // ---
    if let Some(custom) = rust_log.filter(|v| !v.trim().is_empty()) {
        return custom.to_string();
    }

    let level = match level.map(str::to_ascii_lowercase).as_deref() {
        Some(l @ ("trace" | "debug" | "info" | "warn" | "error")) => l.to_string(),
        _ if verbose => "debug".to_string(),
        _ => "info".to_string(),
    };
    format!("warn,{}={level}", env!("CARGO_CRATE_NAME"))
}
