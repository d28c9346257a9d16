//! Profile and local configuration command handlers.

use super::{Context, CreateProfileArgs};
use crate::config::ProfileSettings;
use crate::error::{Result, VantageError};

/// Handle `vantage profile create`.
pub fn handle_create(ctx: &Context, args: CreateProfileArgs) -> Result<()> {
    let mut settings = ProfileSettings::default();
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    if let Some(url) = args.oidc_url {
        settings.oidc_base_url = url;
    }
    if let Some(url) = args.tunnel_url {
        settings.tunnel_api_url = url;
    }
    if let Some(client_id) = args.client_id {
        settings.oidc_client_id = client_id;
    }
    if let Some(secs) = args.max_poll_time {
        settings.oidc_max_poll_time = secs;
    }
    if let Some(secs) = args.refresh_margin {
        settings.token_refresh_margin = secs;
    }

    let profile = ctx.profiles.create(&args.name, settings, args.force)?;
    if args.activate {
        ctx.profiles.set_active(&profile.name)?;
    }
    ctx.emit(&profile, |p| format!("✅ Created profile {}", p.name))
}

/// Handle `vantage profile get <name>`.
pub fn handle_get(ctx: &Context, name: &str) -> Result<()> {
    let profile = ctx.profiles.get(name)?;
    ctx.emit(&profile, |p| {
        let s = &p.settings;
        [
            format!("Profile: {}", p.name),
            format!("  API URL: {}", s.api_base_url),
            format!("  OIDC URL: {}", s.oidc_base_url),
            format!("  Tunnel URL: {}", s.tunnel_api_url),
            format!("  Client ID: {}", s.oidc_client_id),
            format!("  Max poll time: {}s", s.oidc_max_poll_time),
            format!("  Refresh margin: {}s", s.token_refresh_margin),
        ]
        .join("\n")
    })
}

/// Handle `vantage profile list`.
pub fn handle_list(ctx: &Context) -> Result<()> {
    let profiles = ctx.profiles.list()?;
    ctx.emit(&profiles, |list| {
        if list.is_empty() {
            return "No profiles configured".to_string();
        }
        list.iter()
            .map(|p| {
                let marker = if p.is_active { "*" } else { " " };
                format!("{marker} {}  {}", p.name, p.settings.api_base_url)
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Handle `vantage profile use <name>`.
pub fn handle_use(ctx: &Context, name: &str) -> Result<()> {
    ctx.profiles.set_active(name)?;
    ctx.emit(&name, |n| format!("✅ Active profile is now {n}"))
}

/// Handle `vantage profile delete <name>`.
pub fn handle_delete(ctx: &Context, name: &str, force: bool) -> Result<()> {
    ctx.profiles.delete(name, force)?;
    ctx.emit(&name, |n| format!("✅ Deleted profile {n}"))
}

/// Handle `vantage config clear`.
pub fn handle_config_clear(ctx: &Context, force: bool) -> Result<()> {
    if !force {
        return Err(VantageError::Configuration(format!(
            "refusing to remove {} without --force",
            ctx.profiles.home().display()
        )));
    }
    ctx.profiles.clear_all()?;
    let home = ctx.profiles.home().display().to_string();
    ctx.emit(&home, |h| format!("✅ Removed {h}"))
}
