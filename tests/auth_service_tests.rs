mod auth_support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use vantage::auth::{
    AuthError, AuthService, CredentialSource, DeviceCodePoll, LoginOutcome, RefreshFailure,
    TokenRefresher, TokenStore,
};

use auth_support::{
    access_token, credentials, grant, start_time, InMemoryTokenStore, ManualClock,
    RecordingPrompt, ScriptedOidc,
};

struct Harness {
    store: Arc<InMemoryTokenStore>,
    oidc: Arc<ScriptedOidc>,
    prompt: Arc<RecordingPrompt>,
    service: AuthService,
}

fn harness(oidc: ScriptedOidc) -> Harness {
    let store = Arc::new(InMemoryTokenStore::new());
    let oidc = Arc::new(oidc);
    let prompt = Arc::new(RecordingPrompt::new());
    let service = AuthService::new(store.clone(), oidc.clone())
        .with_clock(Arc::new(ManualClock::new()))
        .with_prompt(prompt.clone());
    Harness {
        store,
        oidc,
        prompt,
        service,
    }
}

#[tokio::test]
async fn valid_cached_credentials_skip_the_network() {
    let h = harness(ScriptedOidc::new());
    let cached = credentials("ada@example.com", Some("r"), start_time(), 3600);
    h.store.seed("default", cached.clone());

    let auth = h
        .service
        .ensure_authenticated("default")
        .await
        .expect("cached credentials are valid");

    assert_eq!(auth.access_token, cached.access_token);
    assert_eq!(auth.source, CredentialSource::Cache);
    assert_eq!(auth.persona.email, "ada@example.com");
    assert_eq!(auth.persona.org_id.as_deref(), Some("org-1"));
    assert_eq!(h.oidc.starts(), 0);
    assert_eq!(h.oidc.refreshes(), 0);
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn expired_credentials_are_refreshed_and_persisted() {
    let h = harness(ScriptedOidc::new().then_refresh(Ok(grant("ada@example.com", None, 3600))));
    h.store.seed(
        "default",
        credentials("ada@example.com", Some("r"), start_time() - chrono::Duration::seconds(3610), 3600),
    );

    let auth = h.service.ensure_authenticated("default").await.expect("refresh succeeds");

    let stored = h.store.get("default").expect("refreshed credentials cached");
    assert_eq!(auth.source, CredentialSource::Refreshed);
    assert_eq!(auth.access_token, stored.access_token);
    assert_eq!(stored.expires_at, start_time() + chrono::Duration::seconds(3600));
    assert_eq!(stored.refresh_token.as_deref(), Some("r"));
    assert_eq!(h.oidc.refresh_tokens_seen(), vec!["r".to_string()]);
    assert_eq!(h.oidc.starts(), 0);
}

#[tokio::test]
async fn near_expiry_credentials_refresh_inside_the_margin() {
    let h = harness(
        ScriptedOidc::new().then_refresh(Ok(grant("ada@example.com", Some("r2"), 3600))),
    );
    // Still valid for two minutes, inside the default five-minute margin.
    h.store.seed(
        "default",
        credentials("ada@example.com", Some("r1"), start_time() - chrono::Duration::seconds(3480), 3600),
    );

    let auth = h.service.ensure_authenticated("default").await.expect("refresh succeeds");

    assert_eq!(auth.source, CredentialSource::Refreshed);
    assert_eq!(
        h.store.get("default").and_then(|c| c.refresh_token).as_deref(),
        Some("r2")
    );
}

#[tokio::test]
async fn failed_refresh_falls_back_to_one_device_flow() {
    let h = harness(
        ScriptedOidc::new()
            .then_refresh(Err(RefreshFailure::InvalidGrant("Token is not active".to_string())))
            .then_poll(DeviceCodePoll::Authorized {
                grant: grant("ada@example.com", Some("fresh-refresh"), 3600),
            }),
    );
    h.store.seed(
        "default",
        credentials("ada@example.com", Some("stale"), start_time() - chrono::Duration::hours(2), 3600),
    );

    let auth = h.service.ensure_authenticated("default").await.expect("device flow succeeds");

    assert_eq!(auth.source, CredentialSource::DeviceFlow);
    assert_eq!(h.oidc.refreshes(), 1);
    assert_eq!(h.oidc.starts(), 1);
    assert_eq!(h.prompt.shown().len(), 1);
    assert_eq!(
        h.store.get("default").and_then(|c| c.refresh_token).as_deref(),
        Some("fresh-refresh")
    );
}

#[tokio::test]
async fn missing_refresh_token_goes_straight_to_device_flow() {
    let h = harness(ScriptedOidc::new().then_poll(DeviceCodePoll::Authorized {
        grant: grant("ada@example.com", None, 3600),
    }));
    h.store.seed(
        "default",
        credentials("ada@example.com", None, start_time() - chrono::Duration::hours(2), 3600),
    );

    let auth = h.service.ensure_authenticated("default").await.expect("device flow succeeds");

    assert_eq!(auth.source, CredentialSource::DeviceFlow);
    assert_eq!(h.oidc.refreshes(), 0);
    assert_eq!(h.oidc.starts(), 1);
}

#[tokio::test]
async fn empty_cache_runs_device_flow_and_persists() {
    let h = harness(ScriptedOidc::new().then_poll(DeviceCodePoll::Authorized {
        grant: grant("ada@example.com", Some("r"), 3600),
    }));

    let auth = h.service.ensure_authenticated("default").await.expect("device flow succeeds");

    let stored = h.store.get("default").expect("credentials cached");
    assert_eq!(stored.access_token, auth.access_token);
    assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn denied_device_flow_leaves_cache_empty() {
    let h = harness(ScriptedOidc::new().then_poll(DeviceCodePoll::AccessDenied));

    let err = h
        .service
        .ensure_authenticated("default")
        .await
        .expect_err("denied login must fail");

    assert!(matches!(err, AuthError::DeviceFlowDenied));
    assert!(err.needs_login());
    assert!(h.store.get("default").is_none());
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn cache_write_failure_is_fatal() {
    let h = harness(ScriptedOidc::new().then_poll(DeviceCodePoll::Authorized {
        grant: grant("ada@example.com", Some("r"), 3600),
    }));
    h.store.fail_saves();

    let err = h
        .service
        .ensure_authenticated("default")
        .await
        .expect_err("unsaved credentials must not be returned");

    assert!(matches!(err, AuthError::CacheWrite(_)));
}

#[tokio::test]
async fn undecodable_token_asks_for_login() {
    let h = harness(ScriptedOidc::new());
    let mut cached = credentials("ada@example.com", None, start_time(), 3600);
    cached.access_token = "opaque-token".to_string();
    h.store.seed("default", cached);

    let err = h
        .service
        .ensure_authenticated("default")
        .await
        .expect_err("opaque token has no persona");

    assert!(matches!(err, AuthError::InvalidToken(_)));
    assert!(err.needs_login());
}

#[tokio::test]
async fn profiles_do_not_share_credentials() {
    let h = harness(ScriptedOidc::new().then_poll(DeviceCodePoll::Authorized {
        grant: grant("bob@example.com", None, 3600),
    }));
    h.store.seed(
        "staging",
        credentials("ada@example.com", None, start_time(), 3600),
    );

    let auth = h.service.ensure_authenticated("prod").await.expect("device flow succeeds");

    assert_eq!(auth.persona.email, "bob@example.com");
    assert_eq!(
        h.store.get("staging").map(|c| c.access_token),
        Some(access_token("ada@example.com"))
    );
}

#[tokio::test]
async fn login_reuses_valid_credentials() {
    let h = harness(ScriptedOidc::new());
    h.store.seed("default", credentials("ada@example.com", None, start_time(), 3600));

    let outcome = h.service.login("default").await.expect("login succeeds");

    assert!(matches!(outcome, LoginOutcome::AlreadyAuthenticated(_)));
    assert_eq!(h.oidc.starts(), 0);
}

#[tokio::test]
async fn login_with_expired_credentials_runs_device_flow() {
    let h = harness(ScriptedOidc::new().then_poll(DeviceCodePoll::Authorized {
        grant: grant("ada@example.com", Some("r"), 3600),
    }));
    h.store.seed(
        "default",
        credentials("ada@example.com", Some("old"), start_time() - chrono::Duration::hours(2), 3600),
    );

    let outcome = h.service.login("default").await.expect("login succeeds");

    match outcome {
        LoginOutcome::LoggedIn(auth) => assert_eq!(auth.source, CredentialSource::DeviceFlow),
        other => panic!("expected a fresh login, got {other:?}"),
    }
    assert_eq!(h.oidc.refreshes(), 0);
}

#[tokio::test]
async fn logout_clears_and_reports_email() {
    let h = harness(ScriptedOidc::new());
    h.store.seed("default", credentials("ada@example.com", None, start_time(), 3600));

    let persona = h.service.logout("default").expect("logout succeeds");

    assert_eq!(persona.map(|p| p.email).as_deref(), Some("ada@example.com"));
    assert!(h.store.load("default").expect("load").is_none());
    assert_eq!(h.service.logout("default").expect("second logout"), None);
}

#[tokio::test]
async fn status_reads_cache_without_network() {
    let h = harness(ScriptedOidc::new());
    assert!(h.service.status("default").expect("status").is_none());

    let expired = credentials("ada@example.com", Some("r"), start_time() - chrono::Duration::hours(2), 3600);
    h.store.seed("default", expired.clone());

    let status = h.service.status("default").expect("status").expect("session cached");
    assert_eq!(status.expires_at, expired.expires_at);
    assert_eq!(status.persona.email, "ada@example.com");
    assert_eq!(h.oidc.refreshes(), 0);
    assert_eq!(h.oidc.starts(), 0);
}

#[tokio::test]
async fn refresher_without_refresh_token_makes_no_request() {
    let oidc = ScriptedOidc::new();
    let clock = ManualClock::new();
    let expired = credentials("ada@example.com", None, start_time() - chrono::Duration::hours(2), 3600);

    let err = TokenRefresher::new(&oidc, &clock)
        .refresh(&expired)
        .await
        .expect_err("nothing to refresh with");

    assert_eq!(err, RefreshFailure::MissingRefreshToken);
    assert_eq!(oidc.refreshes(), 0);
}

#[tokio::test]
async fn refresher_rejects_empty_access_token() {
    let mut empty = grant("ada@example.com", None, 3600);
    empty.access_token.clear();
    let oidc = ScriptedOidc::new().then_refresh(Ok(empty));
    let clock = ManualClock::new();
    let expired = credentials("ada@example.com", Some("r"), start_time() - chrono::Duration::hours(2), 3600);

    let err = TokenRefresher::new(&oidc, &clock)
        .refresh(&expired)
        .await
        .expect_err("empty access token");

    assert!(matches!(err, RefreshFailure::InvalidResponse(_)));
}
