//! Vantage CLI binary entry point.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vantage::cli::errors::format_error_help;
use vantage::cli::{dispatch, Cli, Commands, Context};
use vantage::config::{Profile, ProfileSettings, ProfileStore, DEFAULT_PROFILE};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let verbose = cli.verbose;
    if let Err(e) = run(cli).await {
        eprintln!("❌ {}", format_error_help(&e, verbose));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "vantage=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> vantage::error::Result<()> {
    let profiles = ProfileStore::new_default();

    // `config clear` neither creates nor reads any profile.
    let profile = if matches!(cli.command, Commands::Config(_)) {
        Profile {
            name: DEFAULT_PROFILE.to_string(),
            settings: ProfileSettings::default(),
        }
    } else {
        profiles.ensure_default()?;
        // An explicit --profile only selects credentials; profile management
        // commands name their target themselves.
        let explicit = match cli.command {
            Commands::Profile(_) => None,
            _ => cli.profile.as_deref(),
        };
        profiles.resolve(explicit)?
    };
    tracing::debug!(profile = %profile.name, "Resolved profile");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let ctx = Context {
        profiles,
        profile,
        json: cli.json,
        cancel,
    };
    dispatch(&ctx, cli.command).await
}
