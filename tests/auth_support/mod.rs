#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use vantage::auth::{
    AuthError, CredentialSet, DeviceCodePoll, DeviceCodeSession, DevicePrompt, LoginInstructions,
    OidcProvider, RefreshFailure, TokenGrant, TokenStore,
};
use vantage::util::clock::Clock;

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, CredentialSet>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, profile: &str, credentials: CredentialSet) {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(profile.to_string(), credentials);
    }

    pub fn get(&self, profile: &str) -> Option<CredentialSet> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(profile)
            .cloned()
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, profile: &str) -> Result<Option<CredentialSet>, AuthError> {
        Ok(self.get(profile))
    }

    fn save(&self, profile: &str, credentials: &CredentialSet) -> Result<(), AuthError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AuthError::CacheWrite("disk full".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.seed(profile, credentials.clone());
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .remove(profile);
        Ok(())
    }
}

/// Clock whose `sleep` advances `now` instantly and records the request.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(start_time())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("clock lock poisoned").clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .expect("clock lock poisoned")
            .push(duration);
        let step = chrono::Duration::from_std(duration).expect("sleep fits in chrono");
        *self.now.lock().expect("clock lock poisoned") += step;
        tokio::task::yield_now().await;
    }
}

/// OIDC provider that replays queued responses and counts calls.
///
/// Polls beyond the queue answer `Pending`; refreshes beyond the queue fail
/// with a network error.
#[derive(Default)]
pub struct ScriptedOidc {
    session: Mutex<Option<DeviceCodeSession>>,
    start_error: Mutex<Option<AuthError>>,
    polls: Mutex<VecDeque<Result<DeviceCodePoll, AuthError>>>,
    refreshes: Mutex<VecDeque<Result<TokenGrant, RefreshFailure>>>,
    pub start_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    refresh_tokens_seen: Mutex<Vec<String>>,
}

impl ScriptedOidc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: DeviceCodeSession) -> Self {
        *self.session.lock().expect("oidc lock poisoned") = Some(session);
        self
    }

    pub fn failing_start(self, error: AuthError) -> Self {
        *self.start_error.lock().expect("oidc lock poisoned") = Some(error);
        self
    }

    pub fn then_poll(self, poll: DeviceCodePoll) -> Self {
        self.polls
            .lock()
            .expect("oidc lock poisoned")
            .push_back(Ok(poll));
        self
    }

    pub fn then_poll_error(self, error: AuthError) -> Self {
        self.polls
            .lock()
            .expect("oidc lock poisoned")
            .push_back(Err(error));
        self
    }

    pub fn then_refresh(self, result: Result<TokenGrant, RefreshFailure>) -> Self {
        self.refreshes
            .lock()
            .expect("oidc lock poisoned")
            .push_back(result);
        self
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen
            .lock()
            .expect("oidc lock poisoned")
            .clone()
    }
}

#[async_trait]
impl OidcProvider for ScriptedOidc {
    async fn start_device_authorization(&self) -> Result<DeviceCodeSession, AuthError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.start_error.lock().expect("oidc lock poisoned").take() {
            return Err(error);
        }
        Ok(self
            .session
            .lock()
            .expect("oidc lock poisoned")
            .clone()
            .unwrap_or_else(|| session(5, 600)))
    }

    async fn poll_device_token(
        &self,
        _session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .expect("oidc lock poisoned")
            .pop_front()
            .unwrap_or(Ok(DeviceCodePoll::Pending))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, RefreshFailure> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .expect("oidc lock poisoned")
            .push(refresh_token.to_string());
        self.refreshes
            .lock()
            .expect("oidc lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(RefreshFailure::Network("unscripted refresh".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingPrompt {
    shown: Mutex<Vec<LoginInstructions>>,
}

impl RecordingPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<LoginInstructions> {
        self.shown.lock().expect("prompt lock poisoned").clone()
    }
}

impl DevicePrompt for RecordingPrompt {
    fn show(&self, instructions: &LoginInstructions) {
        self.shown
            .lock()
            .expect("prompt lock poisoned")
            .push(instructions.clone());
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

pub fn session(interval_secs: u64, expires_in_secs: u64) -> DeviceCodeSession {
    DeviceCodeSession {
        device_code: "device-code-1".to_string(),
        user_code: "ABCD-EFGH".to_string(),
        verification_uri: "https://auth.example.com/realms/vantage/device".to_string(),
        verification_uri_complete: Some(
            "https://auth.example.com/realms/vantage/device?user_code=ABCD-EFGH".to_string(),
        ),
        interval_secs,
        expires_in_secs,
    }
}

/// Unsigned JWT with the given claims.
pub fn jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn access_token(email: &str) -> String {
    jwt(json!({
        "sub": format!("user-{email}"),
        "email": email,
        "azp": "vantage-cli",
        "organization": {"org-1": {"id": "org-1"}}
    }))
}

pub fn grant(email: &str, refresh_token: Option<&str>, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: access_token(email),
        refresh_token: refresh_token.map(String::from),
        token_type: Some("Bearer".to_string()),
        expires_in: Some(expires_in),
    }
}

/// Credentials issued at `issued_at` that expire `lifetime_secs` later.
pub fn credentials(
    email: &str,
    refresh_token: Option<&str>,
    issued_at: DateTime<Utc>,
    lifetime_secs: i64,
) -> CredentialSet {
    CredentialSet {
        access_token: access_token(email),
        refresh_token: refresh_token.map(String::from),
        token_type: "Bearer".to_string(),
        issued_at,
        expires_at: issued_at + chrono::Duration::seconds(lifetime_secs),
    }
}
