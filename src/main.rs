//! CLI entry point for the stop delay collector.
//!
//! `collect` runs the polling batch (optionally repeated), `init-db` only
//! prepares the store, `list-stops` builds the stop lookup table and
//! `lookup-stop` queries it.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use stop_delay_collector::{
    collector::{Collector, bootstrap},
    config::{CollectorConfig, api_key_from_env},
    directory::StopDirectory,
    filter::ProviderClock,
    gate::FixedDelayGate,
    infra::cumtd::CumtdClient,
    output::{append_record, print_json, stop_rows, write_stop_rows},
    services::transit_api::TransitApi,
};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "stop_delay_collector")]
#[command(about = "Logs real-time stop delays from the CUMTD API", long_about = None)]
struct Cli {
    /// JSON file with collector settings; flags override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Directory with the static GTFS feed (trips.txt, stop_times.txt)
    #[arg(short, long)]
    gtfs_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every stop with an imminent departure and store the delays
    Collect {
        #[command(flatten)]
        store: StoreArgs,

        /// Lookahead window in minutes
        #[arg(short, long)]
        window_minutes: Option<u32>,

        /// Seconds to wait after each successful request
        #[arg(short, long)]
        delay_secs: Option<u64>,

        /// Provider time zone (IANA name)
        #[arg(long)]
        timezone: Option<String>,

        /// API base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Number of runs (0 = infinite)
        #[arg(short, long)]
        num_runs: Option<usize>,

        /// Seconds between runs
        #[arg(short, long)]
        run_interval_secs: Option<u64>,

        /// CSV file to append run summaries to
        #[arg(long)]
        summary_csv: Option<PathBuf>,
    },
    /// Create the database tables and seed them from the static feed
    InitDb {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Fetch the provider's stop listing into a CSV lookup table
    ListStops {
        /// CSV file to write
        #[arg(short, long, default_value = "all_stops.csv")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,

        /// API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Resolve a stop name to its stop id using the lookup table
    LookupStop {
        #[arg(value_name = "NAME")]
        name: String,

        /// Stop listing written by list-stops
        #[arg(short, long, default_value = "all_stops.csv")]
        stops_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/stop_delay_collector.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("stop_delay_collector.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CollectorConfig::load(path)?,
        None => CollectorConfig::default(),
    };

    match cli.command {
        Commands::Collect {
            store,
            window_minutes,
            delay_secs,
            timezone,
            base_url,
            num_runs,
            run_interval_secs,
            summary_csv,
        } => {
            apply_store_args(&mut config, store);
            if let Some(v) = window_minutes {
                config.window_minutes = v;
            }
            if let Some(v) = delay_secs {
                config.delay_secs = v;
            }
            if let Some(v) = timezone {
                config.timezone = v;
            }
            if let Some(v) = base_url {
                config.base_url = v;
            }
            if let Some(v) = num_runs {
                config.num_runs = v;
            }
            if let Some(v) = run_interval_secs {
                config.run_interval_secs = v;
            }
            if summary_csv.is_some() {
                config.summary_csv = summary_csv;
            }
            collect(&config).await?;
        }
        Commands::InitDb { store } => {
            apply_store_args(&mut config, store);
            let (schedule, store) = bootstrap(&config.gtfs_dir, &config.database).await?;
            info!(
                stop_times = schedule.stop_times().len(),
                rows = store.stop_time_count().await?,
                database = %config.database.display(),
                "Database ready"
            );
        }
        Commands::ListStops {
            output,
            force,
            base_url,
        } => {
            if output.exists() && !force {
                info!(path = %output.display(), "Stop listing already exists, continuing");
                return Ok(());
            }
            let base_url = base_url.unwrap_or(config.base_url);
            let client = CumtdClient::new(api_key_from_env()?, &base_url);
            let response = client.all_stops().await?;
            if response.status.code != 200 {
                anyhow::bail!(
                    "getstops returned status {}: {}",
                    response.status.code,
                    response.status.msg
                );
            }
            write_stop_rows(&output, &stop_rows(&response.stops))?;
        }
        Commands::LookupStop { name, stops_file } => {
            let directory = StopDirectory::load(&stops_file)?;
            match directory.stop_id_for_name(&name) {
                Some(stop_id) => info!(name = %name, stop_id, "Stop found"),
                None => warn!(name = %name, entries = directory.len(), "No stop with that name"),
            }
        }
    }

    Ok(())
}

fn apply_store_args(config: &mut CollectorConfig, args: StoreArgs) {
    if let Some(dir) = args.gtfs_dir {
        config.gtfs_dir = dir;
    }
    if let Some(db) = args.database {
        config.database = db;
    }
}

/// Loads static data once, then runs the batch `num_runs` times.
#[tracing::instrument(skip_all, fields(num_runs = config.num_runs))]
async fn collect(config: &CollectorConfig) -> Result<()> {
    let tz = config.tz()?;
    let (schedule, store) = bootstrap(&config.gtfs_dir, &config.database)
        .await
        .context("cannot start collection")?;
    let client = CumtdClient::new(api_key_from_env()?, &config.base_url);
    let clock = ProviderClock { tz };
    let collector = Collector::new(&schedule, &store, config.window_minutes);

    if config.num_runs == 0 {
        info!(run_interval_secs = config.run_interval_secs, "Collecting indefinitely. Press Ctrl+C to stop.");
    }

    let mut run_count = 0usize;
    loop {
        if config.num_runs > 0 && run_count >= config.num_runs {
            break;
        }
        run_count += 1;

        let gate = FixedDelayGate::new(config.request_delay());
        let summary = collector.run(&client, gate, &clock).await;
        print_json(&summary)?;

        if let Some(path) = &config.summary_csv {
            if let Err(e) = append_record(path, &summary) {
                error!(path = %path.display(), error = %e, "Failed to append run summary");
            }
        }

        if config.num_runs == 0 || run_count < config.num_runs {
            info!(run_interval_secs = config.run_interval_secs, "Waiting before next run");
            tokio::time::sleep(config.run_interval()).await;
        }
    }

    Ok(())
}
