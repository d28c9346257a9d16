//! Command-line interface for the Vantage CLI.

pub mod auth;
pub mod errors;
pub mod profile;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{Profile, ProfileStore};
use crate::error::Result;

/// Vantage Compute CLI
#[derive(Parser, Debug)]
#[command(name = "vantage", version, about = "Vantage Compute command-line client")]
pub struct Cli {
    /// Profile to use instead of the active one
    #[arg(short, long, global = true, env = "VANTAGE_PROFILE")]
    pub profile: Option<String>,

    /// Show debug logs and technical error detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON
    #[arg(short, long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with the device authorization flow
    Login,
    /// Forget the cached credentials of the profile
    Logout,
    /// Show who the current credentials belong to
    Whoami,
    /// Manage profiles
    Profile(ProfileArgs),
    /// Manage local configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Create a profile
    Create(CreateProfileArgs),
    /// Show one profile
    Get { name: String },
    /// List all profiles
    List,
    /// Make a profile the active one
    Use { name: String },
    /// Delete a profile and its cached credentials
    Delete {
        name: String,
        /// Required to delete the default profile
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for `vantage profile create`.
#[derive(Args, Debug)]
pub struct CreateProfileArgs {
    pub name: String,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub oidc_url: Option<String>,

    #[arg(long)]
    pub tunnel_url: Option<String>,

    #[arg(long)]
    pub client_id: Option<String>,

    /// Seconds to wait for a device login before giving up
    #[arg(long)]
    pub max_poll_time: Option<u64>,

    /// Refresh tokens this many seconds before they expire
    #[arg(long)]
    pub refresh_margin: Option<u64>,

    /// Overwrite an existing profile
    #[arg(long)]
    pub force: bool,

    /// Make the new profile active
    #[arg(long)]
    pub activate: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Remove all profiles and cached credentials
    Clear {
        /// Confirm the removal
        #[arg(long)]
        force: bool,
    },
}

/// Per-invocation state handed to every command handler.
pub struct Context {
    pub profiles: ProfileStore,
    /// Profile resolved once at startup.
    pub profile: Profile,
    pub json: bool,
    pub cancel: CancellationToken,
}

impl Context {
    /// Print `value` as JSON or through `plain`, depending on `--json`.
    pub fn emit<T: Serialize>(&self, value: &T, plain: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", plain(value));
        }
        Ok(())
    }
}

/// Run one parsed command.
pub async fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Login => auth::handle_login(ctx).await,
        Commands::Logout => auth::handle_logout(ctx),
        Commands::Whoami => auth::handle_whoami(ctx).await,
        Commands::Profile(args) => match args.command {
            ProfileCommands::Create(create) => profile::handle_create(ctx, create),
            ProfileCommands::Get { name } => profile::handle_get(ctx, &name),
            ProfileCommands::List => profile::handle_list(ctx),
            ProfileCommands::Use { name } => profile::handle_use(ctx, &name),
            ProfileCommands::Delete { name, force } => profile::handle_delete(ctx, &name, force),
        },
        Commands::Config(args) => match args.command {
            ConfigCommands::Clear { force } => profile::handle_config_clear(ctx, force),
        },
    }
}
