//! PathLedger CLI - a command-line front end for the supply-chain dashboard.
//!
//! Plays the part of the browser shell: it keeps the session tokens between
//! runs, sends every page visit through the session guard, and lists or
//! fetches dashboard resources.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{DateArg, FilterArg, ResourceKind};
use pathledger_core::{App, Config};

#[derive(Parser)]
#[command(name = "pathledger")]
#[command(version)]
#[command(about = "PathLedger supply-chain dashboard client", long_about = None)]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, env = "PATHLEDGER_API_BASE_URL", global = true)]
    api_url: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long, env = "PATHLEDGER_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        #[arg(short, long, env = "PATHLEDGER_USERNAME")]
        username: Option<String>,

        /// Page to continue to after logging in
        #[arg(long)]
        redirect: Option<String>,
    },

    /// Forget the stored tokens
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Visit a dashboard page through the session guard
    Open {
        /// Path with optional query, e.g. /dashboard/tracker/9?token=abc
        path: String,
    },

    /// List a resource collection
    List {
        #[arg(value_enum)]
        resource: ResourceKind,

        #[arg(long)]
        page_size: Option<u32>,

        /// Sort field; prefix with '-' for descending
        #[arg(long)]
        ordering: Option<String>,

        /// Exact-match filter, repeatable
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<FilterArg>,

        /// Only items at or after this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        since: Option<DateArg>,

        /// Only items at or before this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        until: Option<DateArg>,

        /// One-time access token from a QR link. Needs a filter naming the
        /// linked item: tracker=ID for tracker-events, productorder=ID for
        /// product-events.
        #[arg(long)]
        token: Option<String>,
    },

    /// Fetch one item
    Get {
        #[arg(value_enum)]
        resource: ResourceKind,

        id: String,

        /// One-time access token from a QR link
        #[arg(long)]
        token: Option<String>,
    },

    /// Order counts with deltas, plus open alerts
    Summary {
        #[arg(long)]
        since: Option<DateArg>,

        #[arg(long)]
        until: Option<DateArg>,
    },

    /// List alert notifications
    Alerts,

    /// Acknowledge a notification
    Ack { id: i64 },
}

/// Initialize the tracing subscriber for logging. The returned guard must be
/// held until exit so buffered file output is flushed.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // RUST_LOG controls the level (e.g. RUST_LOG=pathledger_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pathledger.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());
    info!("PathLedger CLI starting");

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = Some(url);
    }
    debug!(base_url = config.api_base_url(), "Config loaded");

    let app = App::new(config)?;

    match cli.command {
        Commands::Login { username, redirect } => {
            commands::login(&app, username, redirect).await
        }
        Commands::Logout => commands::logout(&app),
        Commands::Whoami => commands::whoami(&app).await,
        Commands::Refresh => commands::refresh(&app).await,
        Commands::Open { path } => commands::open(&app, &path).await,
        Commands::List {
            resource,
            page_size,
            ordering,
            filters,
            since,
            until,
            token,
        } => {
            let query = commands::build_query(
                page_size,
                ordering,
                filters,
                since,
                until,
                resource.date_field(),
            );
            commands::list(&app, resource, &query, token).await
        }
        Commands::Get {
            resource,
            id,
            token,
        } => commands::get(&app, resource, &id, token).await,
        Commands::Summary { since, until } => {
            commands::summary(&app, since.map(Into::into), until.map(Into::into)).await
        }
        Commands::Alerts => commands::alerts(&app).await,
        Commands::Ack { id } => commands::ack(&app, id).await,
    }
}
