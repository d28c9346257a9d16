//! CLI auth command handlers for login, logout, and whoami.

use std::sync::Arc;

use serde::Serialize;

use super::Context;
use crate::auth::{AuthService, Authenticated, DevicePrompt, LoginInstructions, LoginOutcome};
use crate::error::Result;

/// Prints device-login instructions to stderr so stdout stays parseable.
pub struct TerminalPrompt;

impl DevicePrompt for TerminalPrompt {
    fn show(&self, instructions: &LoginInstructions) {
        eprintln!("🔗 Visit: {}", instructions.login_url());
        eprintln!("📋 Enter code: {}", instructions.user_code);
        eprintln!(
            "⏳ Waiting for authorization (until {})...",
            instructions.expires_at.format("%H:%M:%S")
        );
    }
}

fn service(ctx: &Context) -> AuthService {
    let settings = ctx.profile.settings.clone().with_env_overrides();
    AuthService::for_settings(ctx.profiles.tokens().clone(), &settings)
        .with_prompt(Arc::new(TerminalPrompt))
        .with_cancellation(ctx.cancel.clone())
}

#[derive(Serialize)]
struct LoginReport<'a> {
    already_authenticated: bool,
    #[serde(flatten)]
    session: &'a Authenticated,
}

/// Handle `vantage login`.
pub async fn handle_login(ctx: &Context) -> Result<()> {
    let (already_authenticated, session) = match service(ctx).login(&ctx.profile.name).await? {
        LoginOutcome::AlreadyAuthenticated(session) => (true, session),
        LoginOutcome::LoggedIn(session) => (false, session),
    };
    let report = LoginReport {
        already_authenticated,
        session: &session,
    };
    ctx.emit(&report, |r| {
        if r.already_authenticated {
            format!(
                "✅ Already logged in as {} (profile {})",
                r.session.persona.email, r.session.profile
            )
        } else {
            format!(
                "✅ Logged in as {} (profile {})",
                r.session.persona.email, r.session.profile
            )
        }
    })
}

#[derive(Serialize)]
struct LogoutReport {
    profile: String,
    email: Option<String>,
}

/// Handle `vantage logout`.
pub fn handle_logout(ctx: &Context) -> Result<()> {
    let persona = service(ctx).logout(&ctx.profile.name)?;
    let report = LogoutReport {
        profile: ctx.profile.name.clone(),
        email: persona.map(|p| p.email),
    };
    ctx.emit(&report, |r| match &r.email {
        Some(email) => format!("✅ Logged out {email} from profile {}", r.profile),
        None => format!("✅ No active session for profile {}", r.profile),
    })
}

/// Handle `vantage whoami`.
pub async fn handle_whoami(ctx: &Context) -> Result<()> {
    let session = service(ctx).ensure_authenticated(&ctx.profile.name).await?;
    ctx.emit(&session, |s| {
        let mut lines = vec![format!("👤 {}", s.persona.email)];
        if let Some(name) = &s.persona.name {
            lines.push(format!("   Name: {name}"));
        }
        if let Some(user_id) = &s.persona.user_id {
            lines.push(format!("   User ID: {user_id}"));
        }
        if let Some(org_id) = &s.persona.org_id {
            lines.push(format!("   Organization: {org_id}"));
        }
        lines.push(format!("   Client: {}", s.persona.client_id));
        lines.push(format!("   Profile: {}", s.profile));
        lines.push(format!(
            "   Token expires: {}",
            s.expires_at.format("%Y-%m-%d %H:%M UTC")
        ));
        lines.join("\n")
    })
}
