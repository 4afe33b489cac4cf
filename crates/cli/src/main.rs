//! Carryover CLI - Operator tools for guest and account collections.
//!
//! # Usage
//!
//! ```bash
//! # Show an account's remote cart
//! carryover remote list --user 42 --kind cart
//!
//! # Wipe an account's remote wishlist
//! carryover remote clear --user 42 --kind wishlist
//!
//! # Show guest collections kept in the local directory
//! carryover local list
//!
//! # Forget the guest recently-viewed list
//! carryover local clear --kind recently-viewed
//!
//! # Carry guest collections from the local directory into an account
//! carryover merge --user 42
//! ```
//!
//! # Commands
//!
//! - `remote` - Inspect or clear remote collections
//! - `local` - Inspect or clear local guest collections
//! - `merge` - Re-run a pending guest-to-account merge

#![cfg_attr(not(test), forbid(unsafe_code))]

use carryover_core::{CollectionKind, UserId};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "carryover")]
#[command(author, version, about = "Carryover sync engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or clear an account's remote collections
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
    /// Inspect or clear guest collections in the local directory
    Local {
        #[command(subcommand)]
        action: LocalAction,
    },
    /// Merge guest collections from the local directory into an account
    Merge {
        /// Account to merge into
        #[arg(short, long)]
        user: UserId,
    },
}

#[derive(Subcommand)]
enum RemoteAction {
    /// List a remote collection
    List {
        #[arg(short, long)]
        user: UserId,

        /// Collection (`cart`, `wishlist`, `recently_viewed`)
        #[arg(short, long)]
        kind: CollectionKind,
    },
    /// Delete every item of a remote collection
    Clear {
        #[arg(short, long)]
        user: UserId,

        /// Collection (`cart`, `wishlist`, `recently_viewed`)
        #[arg(short, long)]
        kind: CollectionKind,
    },
}

#[derive(Subcommand)]
enum LocalAction {
    /// List guest collections (all kinds unless one is given)
    List {
        #[arg(short, long)]
        kind: Option<CollectionKind>,
    },
    /// Forget guest collections (all kinds unless one is given)
    Clear {
        #[arg(short, long)]
        kind: Option<CollectionKind>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|v| !v.is_empty())?;
    let environment = std::env::var("SENTRY_ENVIRONMENT").ok();

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: environment.map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carryover_sync=info,carryover_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Remote { action } => match action {
            RemoteAction::List { user, kind } => commands::remote::list(user, kind).await?,
            RemoteAction::Clear { user, kind } => commands::remote::clear(user, kind).await?,
        },
        Commands::Local { action } => match action {
            LocalAction::List { kind } => commands::local::list(kind)?,
            LocalAction::Clear { kind } => commands::local::clear(kind)?,
        },
        Commands::Merge { user } => commands::merge::run(user).await?,
    }
    Ok(())
}
