//! One-shot session bootstrap.
//!
//! Runs at process start and always settles the store to `Authenticated` or
//! `Guest`: a live session is adopted as-is, a missing one gets a silent
//! renewal attempt, and anything else falls back to guest. Nothing here
//! returns an error to the caller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::gateway::Gateway;
use crate::session::claims;
use crate::session::store::{SessionStatus, SessionStore};

/// Resolve the initial session state.
///
/// Idempotent with respect to the store: a second invocation after the
/// first has settled is a no-op. The `live` token suppresses store writes
/// once the owning scope has been torn down.
pub async fn bootstrap(gateway: Arc<dyn Gateway>, store: SessionStore, live: CancellationToken) {
    if store.status() != SessionStatus::Idle {
        debug!("Session already settled, skipping bootstrap");
        return;
    }

    match gateway.check_session().await {
        Ok(Some(check)) => match claims::decode_expiry(&check.user.token) {
            Ok(expires_at) => {
                if live.is_cancelled() {
                    return;
                }
                store.sign_in(check.principal(), expires_at);
                spawn_profile_fetch(gateway, store, live);
            }
            Err(e) => {
                // The renewal response carries an authoritative expiry, so a
                // credential we cannot read is not fatal yet.
                warn!(error = %e, "Could not read expiry claim, attempting silent renewal");
                silent_renewal(gateway, store, live).await;
            }
        },
        Ok(None) => silent_renewal(gateway, store, live).await,
        Err(e) => {
            warn!(error = %e, "Session check failed");
            if !live.is_cancelled() {
                store.set_guest_with_error("Could not reach the server to restore your session");
            }
        }
    }
}

/// Try the refresh credential; absence of a renewable session is an
/// expected outcome and settles to guest without an error.
async fn silent_renewal(gateway: Arc<dyn Gateway>, store: SessionStore, live: CancellationToken) {
    match gateway.refresh_session().await {
        Ok(renewed) => {
            if live.is_cancelled() {
                return;
            }
            store.set_authenticated(renewed.expires_at);
            spawn_profile_fetch(gateway, store, live);
        }
        Err(e) => {
            debug!(error = %e, "No renewable session, settling to guest");
            if !live.is_cancelled() {
                store.set_guest();
            }
        }
    }
}

/// Fire-and-forget profile fetch. The UI tolerates the profile being
/// absent until this lands; a failure leaves the flags at their defaults.
pub(crate) fn spawn_profile_fetch(
    gateway: Arc<dyn Gateway>,
    store: SessionStore,
    live: CancellationToken,
) {
    tokio::spawn(async move {
        match gateway.fetch_profile().await {
            Ok(profile) => {
                if !live.is_cancelled() {
                    store.merge_profile(profile);
                }
            }
            Err(e) => debug!(error = %e, "Profile fetch failed, flags stay at defaults"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::gateway::{GatewayError, RefreshedSession};
    use crate::session::store::Profile;
    use crate::testutil::{make_jwt, make_session_check, MockGateway};

    #[tokio::test]
    async fn test_live_session_settles_authenticated() {
        let expires_at = Utc::now() + Duration::minutes(10);
        let gateway = Arc::new(MockGateway::new());
        gateway.push_check(Ok(Some(make_session_check("u1", expires_at))));
        gateway.push_profile(Ok(Profile {
            beta_access: true,
            site_beta: false,
        }));
        let store = SessionStore::new();

        bootstrap(gateway.clone(), store.clone(), CancellationToken::new()).await;

        let state = store.snapshot();
        assert!(state.is_authenticated());
        // The decoded claim has second precision
        assert_eq!(
            state.expires_at.unwrap().timestamp(),
            expires_at.timestamp()
        );
        assert_eq!(state.principal.unwrap().id, "u1");

        // Background profile fetch lands without a second settle
        tokio::task::yield_now().await;
        assert!(store.snapshot().profile.unwrap().beta_access);
    }

    #[tokio::test]
    async fn test_no_session_and_failed_renewal_is_silent_guest() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_check(Ok(None));
        gateway.push_refresh(Err(GatewayError::Unauthenticated));
        let store = SessionStore::new();

        bootstrap(gateway, store.clone(), CancellationToken::new()).await;

        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Guest);
        assert!(state.error.is_none(), "guest fallback must be silent");
    }

    #[tokio::test]
    async fn test_silent_renewal_recovers_session() {
        let expires_at = Utc::now() + Duration::hours(1);
        let gateway = Arc::new(MockGateway::new());
        gateway.push_check(Ok(None));
        gateway.push_refresh(Ok(RefreshedSession { expires_at }));
        let store = SessionStore::new();

        bootstrap(gateway, store.clone(), CancellationToken::new()).await;

        let state = store.snapshot();
        assert!(state.is_authenticated());
        assert_eq!(state.expires_at, Some(expires_at));
    }

    #[tokio::test]
    async fn test_check_failure_settles_guest_with_diagnostic() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_check(Err(GatewayError::Server("boom".to_string())));
        let store = SessionStore::new();

        bootstrap(gateway, store.clone(), CancellationToken::new()).await;

        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Guest);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_idempotent_after_settle() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_check(Ok(None));
        gateway.push_refresh(Err(GatewayError::Unauthenticated));
        let store = SessionStore::new();

        bootstrap(gateway.clone(), store.clone(), CancellationToken::new()).await;
        assert_eq!(store.status(), SessionStatus::Guest);

        // Second run must not touch the store or the gateway again
        bootstrap(gateway.clone(), store.clone(), CancellationToken::new()).await;
        assert_eq!(store.status(), SessionStatus::Guest);
        assert_eq!(gateway.check_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_claim_falls_back_to_renewal() {
        let expires_at = Utc::now() + Duration::hours(1);
        let gateway = Arc::new(MockGateway::new());
        let mut check = make_session_check("u1", expires_at);
        check.user.token = "not-a-jwt".to_string();
        gateway.push_check(Ok(Some(check)));
        gateway.push_refresh(Ok(RefreshedSession { expires_at }));
        let store = SessionStore::new();

        bootstrap(gateway, store.clone(), CancellationToken::new()).await;

        assert!(store.is_authenticated());
        assert_eq!(store.expires_at(), Some(expires_at));
    }

    #[tokio::test]
    async fn test_cancelled_scope_suppresses_settle() {
        let expires_at = Utc::now() + Duration::minutes(10);
        let gateway = Arc::new(MockGateway::new());
        gateway.push_check(Ok(Some(make_session_check("u1", expires_at))));
        let store = SessionStore::new();

        let live = CancellationToken::new();
        live.cancel();
        bootstrap(gateway, store.clone(), live).await;

        assert_eq!(store.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_make_jwt_round_trips_through_claims() {
        let expires_at = Utc::now() + Duration::minutes(5);
        let decoded = crate::session::claims::decode_expiry(&make_jwt(expires_at)).unwrap();
        assert_eq!(decoded.timestamp(), expires_at.timestamp());
    }
}
