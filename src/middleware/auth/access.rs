//! access token 検証 → AuthCtx を extensions に入れる
//!
//! - `Authorization: Bearer <token>` があれば session cache を引き、なければ
//!   Authenticator (verify → decode → role mapping) を一度だけ走らせて cache する
//! - 失敗しても request は拒否しない。AuthCtx が付かないだけで、401/403 の判定は gate が行う
//!   (public route は壊れた token でも通す)

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};
use chrono::{DateTime, TimeDelta, Utc};

use crate::api::extractors::AuthCtx;
use crate::services::auth::{AuthFailure, Authority, Identity, SessionKey};
use crate::state::AppState;

pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // token は request から切り離して持つ (await を跨ぐため)
    let token = bearer_token(req.headers()).map(str::to_owned);

    if let Some(token) = token {
        let session_key = SessionKey::from_access_token(&token);

        match resolve_identity(&state, &token, &session_key).await {
            Ok(identity) => {
                // middleware → extractor への受け渡し
                req.extensions_mut()
                    .insert(AuthCtx::new(identity, session_key));
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    session = session_key.short(),
                    "authentication failed"
                );
            }
        }
    }

    next.run(req).await
}

/// `Bearer` scheme is matched case-insensitively.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn resolve_identity(
    state: &AppState,
    token: &str,
    session_key: &SessionKey,
) -> Result<Arc<Identity>, AuthFailure> {
    let now = Utc::now();

    if let Some(identity) = state.sessions.get(session_key, now).await {
        return Ok(identity);
    }

    let identity = Arc::new(state.authenticator.complete(token, now)?);

    let expires_at = identity
        .expires_at()
        .or_else(|| ttl_expiry(now, state.session_ttl_seconds));

    let authorities: Vec<&str> = identity.authorities().iter().map(Authority::as_str).collect();
    match expires_at {
        Some(expires_at) => {
            state
                .sessions
                .insert(session_key.clone(), Arc::clone(&identity), expires_at, now)
                .await;

            tracing::info!(
                subject = identity.subject(),
                authorities = ?authorities,
                session = session_key.short(),
                expires_at = %expires_at,
                "session established"
            );
        }
        None => {
            tracing::warn!(
                subject = identity.subject(),
                authorities = ?authorities,
                session = session_key.short(),
                ttl_seconds = state.session_ttl_seconds,
                "session ttl out of range, not cached"
            );
        }
    }

    Ok(identity)
}

/// Expiry for a token without `exp`. `None` if `now + ttl` is not representable.
fn ttl_expiry(now: DateTime<Utc>, ttl_seconds: u64) -> Option<DateTime<Utc>> {
    let ttl = TimeDelta::try_seconds(i64::try_from(ttl_seconds).ok()?)?;
    now.checked_add_signed(ttl)
}
