mod commands;
mod config;
mod mirror;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::process;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::commands::{
    Outcome, Session, cmd_add, cmd_clear, cmd_delete, cmd_shell, cmd_status, cmd_target_presets,
    cmd_target_set, cmd_target_show, with_latest,
};
use crate::config::Config;
use crate::mirror::{SheetsMirror, settle};
use calorez_core::db::SessionDb;
use calorez_core::models::EntryId;
use calorez_core::service::Tracker;
use calorez_core::sync::{DisabledSink, MirrorSink};

const LOG_ENV: &str = "CALOREZ_LOG";

#[derive(Parser)]
#[command(
    name = "calorez",
    version,
    about = "A tiny daily calorie log",
    long_about = "A tiny daily calorie log.\n\n\
        Entries are kept for the current day only. Every add and delete is also \
        mirrored, best effort, to a spreadsheet endpoint when one is configured."
)]
struct Cli {
    /// Mirror endpoint URL (overrides CALOREZ_ENDPOINT and config.toml)
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Do not mirror anything for this run
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log an entry
    Add {
        /// Calories (a whole number greater than 0)
        #[arg(allow_hyphen_values = true)]
        calories: String,
        /// Mark the entry as junk food (default: healthy)
        #[arg(short, long)]
        junk: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear all of today's entries (local only)
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or choose the daily target
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Show today's log, total, and progress
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive session
    Shell,
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Choose a daily target from the presets
    Set {
        /// One of 1500, 1750, 2000, 2250, 2500
        calories: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current target
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List target presets
    Presets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Rejected) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = Config::load()?;
    let db = SessionDb::open(&config.db_path)?;
    let snapshot = db.load(chrono::Local::now().date_naive())?;

    let mirror = match config.resolve_endpoint(cli.endpoint, cli.offline) {
        Some(url) => Some(Arc::new(SheetsMirror::new(&url)?)),
        None => None,
    };
    let sink: Box<dyn MirrorSink> = match &mirror {
        Some(m) => Box::new(Arc::clone(m)),
        None => Box::new(DisabledSink),
    };
    let mut session: Session = Tracker::from_snapshot(snapshot, sink)?;

    let result = match cli.command {
        Commands::Add {
            calories,
            junk,
            json,
        } => with_latest(&mut session, &db, |s| cmd_add(s, &calories, junk, json)),
        Commands::Delete { id, json } => {
            with_latest(&mut session, &db, |s| cmd_delete(s, EntryId(id), json))
        }
        Commands::Clear { json } => with_latest(&mut session, &db, |s| cmd_clear(s, json)),
        Commands::Target { command } => match command {
            TargetCommands::Set { calories, json } => {
                with_latest(&mut session, &db, |s| cmd_target_set(s, calories, json))
            }
            TargetCommands::Show { json } => cmd_target_show(&session, json),
            TargetCommands::Presets { json } => cmd_target_presets(&session, json),
        },
        Commands::Status { json } => cmd_status(&session, json),
        Commands::Shell => {
            cmd_shell(&mut session, &db, &mut io::stdin().lock()).map(|()| Outcome::Done)
        }
    };

    // Local state is already committed (or failed); either way the mirror
    // gets its grace period before the process exits.
    settle(mirror.as_deref(), config.flush_timeout, result).await
}
