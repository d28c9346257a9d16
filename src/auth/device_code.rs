//! Device authorization grant (RFC 8628): session types and the polling state machine.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::error::AuthError;
use super::oidc::OidcProvider;
use super::token::{CredentialSet, TokenGrant};
use crate::config::DEFAULT_MAX_POLL_TIME_SECS;
use crate::util::clock::Clock;

/// Poll interval used when the provider does not send one.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Added to the poll interval on every `slow_down` response.
pub const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Device authorization session returned by the provider. Lives only for one
/// login attempt and is never written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCodeSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub interval_secs: u64,
    pub expires_in_secs: u64,
}

impl fmt::Debug for DeviceCodeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeSession")
            .field("device_code", &"<redacted>")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("verification_uri_complete", &self.verification_uri_complete)
            .field("interval_secs", &self.interval_secs)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Outcome of a single token-endpoint poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCodePoll {
    Pending,
    SlowDown,
    Authorized { grant: TokenGrant },
    AccessDenied,
    Expired,
}

/// What the user is shown before polling starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginInstructions {
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl LoginInstructions {
    /// Best link to open: the one with the code pre-filled when available.
    pub fn login_url(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

/// Output collaborator that presents the login instructions.
pub trait DevicePrompt: Send + Sync {
    fn show(&self, instructions: &LoginInstructions);
}

/// Prompt that only logs; used when nothing should be printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPrompt;

impl DevicePrompt for SilentPrompt {
    fn show(&self, instructions: &LoginInstructions) {
        tracing::info!(url = instructions.login_url(), "Device login pending");
    }
}

#[derive(Debug)]
enum FlowState {
    Polling { interval: Duration },
    Authorized(TokenGrant),
    Denied,
    TimedOut,
    Cancelled,
}

/// Drives one device-login attempt from start to a terminal state.
///
/// Terminal states: authorized (returns credentials), denied, timed out, or
/// cancelled (all returned as [`AuthError`]). A new attempt needs a new
/// `run`.
pub struct DeviceFlow<'a> {
    oidc: &'a dyn OidcProvider,
    clock: &'a dyn Clock,
    prompt: &'a dyn DevicePrompt,
    cancel: CancellationToken,
    max_poll_time: Duration,
}

impl<'a> DeviceFlow<'a> {
    pub fn new(
        oidc: &'a dyn OidcProvider,
        clock: &'a dyn Clock,
        prompt: &'a dyn DevicePrompt,
    ) -> Self {
        Self {
            oidc,
            clock,
            prompt,
            cancel: CancellationToken::new(),
            max_poll_time: Duration::from_secs(DEFAULT_MAX_POLL_TIME_SECS),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_max_poll_time(mut self, max_poll_time: Duration) -> Self {
        self.max_poll_time = max_poll_time;
        self
    }

    pub async fn run(&self) -> Result<CredentialSet, AuthError> {
        let session = self.oidc.start_device_authorization().await?;
        let started = self.clock.now();
        let limit_secs = self
            .max_poll_time
            .as_secs()
            .min(session.expires_in_secs)
            .min(u64::from(u32::MAX));
        let deadline = started + chrono::Duration::seconds(limit_secs as i64);
        tracing::debug!(?session, %deadline, "Device authorization started");

        self.prompt.show(&LoginInstructions {
            user_code: session.user_code.clone(),
            verification_uri: session.verification_uri.clone(),
            verification_uri_complete: session.verification_uri_complete.clone(),
            expires_at: deadline,
        });

        let mut state = FlowState::Polling {
            interval: Duration::from_secs(session.interval_secs.max(1)),
        };
        let mut attempt = 0u32;
        loop {
            state = match state {
                FlowState::Polling { interval } => {
                    attempt += 1;
                    self.poll_step(&session, interval, deadline, attempt).await?
                }
                FlowState::Authorized(grant) => {
                    tracing::debug!(attempt, "Device login authorized");
                    return Ok(CredentialSet::from_grant(grant, self.clock.now(), None));
                }
                FlowState::Denied => return Err(AuthError::DeviceFlowDenied),
                FlowState::TimedOut => return Err(AuthError::DeviceFlowTimedOut),
                FlowState::Cancelled => return Err(AuthError::DeviceFlowCancelled),
            };
        }
    }

    async fn poll_step(
        &self,
        session: &DeviceCodeSession,
        interval: Duration,
        deadline: DateTime<Utc>,
        attempt: u32,
    ) -> Result<FlowState, AuthError> {
        let remaining = (deadline - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return Ok(FlowState::TimedOut);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(FlowState::Cancelled),
            _ = self.clock.sleep(interval.min(remaining)) => {}
        }
        let remaining = (deadline - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return Ok(FlowState::TimedOut);
        }

        // The deadline also bounds a token request that is slow to answer.
        let poll = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(FlowState::Cancelled),
            poll = self.oidc.poll_device_token(session) => poll?,
            _ = self.clock.sleep(remaining) => {
                tracing::debug!(attempt, "Device token request outlived the login deadline");
                return Ok(FlowState::TimedOut);
            }
        };
        tracing::debug!(attempt, ?interval, outcome = poll_label(&poll), "Polled device token");
        Ok(match poll {
            DeviceCodePoll::Pending => FlowState::Polling { interval },
            DeviceCodePoll::SlowDown => FlowState::Polling {
                interval: slow_down(interval),
            },
            DeviceCodePoll::Authorized { grant } => FlowState::Authorized(grant),
            DeviceCodePoll::AccessDenied => FlowState::Denied,
            DeviceCodePoll::Expired => FlowState::TimedOut,
        })
    }
}

/// Interval after a `slow_down` response; never shorter than `current`.
pub fn slow_down(current: Duration) -> Duration {
    current.saturating_add(Duration::from_secs(SLOW_DOWN_STEP_SECS))
}

fn poll_label(poll: &DeviceCodePoll) -> &'static str {
    match poll {
        DeviceCodePoll::Pending => "authorization_pending",
        DeviceCodePoll::SlowDown => "slow_down",
        DeviceCodePoll::Authorized { .. } => "authorized",
        DeviceCodePoll::AccessDenied => "access_denied",
        DeviceCodePoll::Expired => "expired_token",
    }
}
