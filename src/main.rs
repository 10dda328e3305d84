mod aggregate;
mod client;
mod commands;
mod config;
mod error;
mod models;
mod selection;
mod store;
mod timekey;
mod web;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use aggregate::ConsensusRule;
use models::{AvailabilityStatus, TimeUnit};

/// Meetup planner: collect participant availability and find the dates that work for everyone.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print detailed logs and API responses
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the planner server (JSON API and HTML pages)
    Serve {
        /// Path to config file (defaults to ./config.toml when present)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Listen address, overrides `server.addr` (e.g. "0.0.0.0:3009")
        #[arg(short = 'a', long)]
        addr: Option<String>,
    },

    /// Aggregate a JSON file of participants offline
    ///
    /// The file holds an array of `{ "id", "nickname", "availability": { KEY: STATUS } }`.
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Consensus rule: "everyone" or "respondents" (defaults to config)
        #[arg(long)]
        consensus: Option<ConsensusRule>,

        /// Path to config file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the time-keys covering a date range
    Slots {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last date, inclusive (defaults to --from)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Granularity: "day" or "hour"
        #[arg(short = 'u', long, default_value = "day")]
        unit: TimeUnit,

        /// Path to config file (hour slot bounds)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },

    /// List events on a running server
    Events {
        /// Server base URL
        #[arg(short = 's', long, default_value = client::DEFAULT_SERVER)]
        server: String,
    },

    /// Show aggregated results for an event
    Results {
        #[arg(value_name = "EVENT_ID")]
        event: Uuid,

        /// Server base URL
        #[arg(short = 's', long, default_value = client::DEFAULT_SERVER)]
        server: String,

        /// Override the server's consensus rule
        #[arg(long)]
        consensus: Option<ConsensusRule>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle time-keys in a participant's availability and save it
    ///
    /// Examples:
    ///   mark <PID> -e <EID> --status available 2024-01-20 2024-01-21
    ///   mark <PID> -e <EID> --status maybe --date 2024-01-20 2024-01-20T09:00-10:00
    Mark {
        #[arg(value_name = "PARTICIPANT_ID")]
        participant: Uuid,

        /// Event the participant belongs to
        #[arg(short = 'e', long)]
        event: Uuid,

        /// Status to paint: available, maybe or unavailable
        #[arg(long)]
        status: AvailabilityStatus,

        /// Date being edited (hour events only)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Time-keys to toggle
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,

        /// Server base URL
        #[arg(short = 's', long, default_value = client::DEFAULT_SERVER)]
        server: String,

        /// Show the merged availability without saving it
        #[arg(short = 'd', long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Command::Serve { config, addr } => {
            let cfg = config::resolve_config(config.as_deref())?;
            let addr = addr.clone().unwrap_or_else(|| cfg.server.addr.clone());
            web::serve(cfg, &addr).await?;
        }
        Command::Analyze {
            file,
            consensus,
            config,
            json,
        } => {
            let cfg = config::resolve_config(config.as_deref())?;
            let rule = consensus.unwrap_or(cfg.results.consensus);
            commands::run_analyze(file, rule, cfg.results.best_dates_limit, *json)?;
        }
        Command::Slots {
            from,
            to,
            unit,
            config,
        } => {
            let cfg = config::resolve_config(config.as_deref())?;
            commands::run_slots(*from, *to, *unit, &cfg.slots)?;
        }
        Command::Events { server } => {
            commands::run_events(server).await?;
        }
        Command::Results {
            event,
            server,
            consensus,
            json,
        } => {
            commands::run_results(server, *event, *consensus, *json).await?;
        }
        Command::Mark {
            participant,
            event,
            status,
            date,
            keys,
            server,
            dry_run,
        } => {
            let request = commands::MarkRequest {
                event_id: *event,
                participant_id: *participant,
                status: *status,
                date: *date,
                keys,
                dry_run: *dry_run,
            };
            commands::run_mark(server, request).await?;
        }
    }

    Ok(())
}
