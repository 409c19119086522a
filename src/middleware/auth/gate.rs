//! Route-level authorization.
//!
//! Looks up the matched route in `SecurityPolicy` and checks the identity that
//! `access` attached (if any). Handlers behind this layer never see a request
//! the policy rejected.

use axum::{
    Router,
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::policy::Decision;
use crate::state::AppState;

pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, gate_middleware))
}

async fn gate_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| req.uri().path());
    let identity = req
        .extensions()
        .get::<AuthCtx>()
        .map(|ctx| ctx.identity.as_ref());

    match state.policy.decide(path, identity) {
        Decision::Allow => {}
        Decision::Unauthenticated => {
            tracing::debug!(path, "no authenticated identity for protected route");
            return Err(AppError::Unauthorized);
        }
        Decision::Forbidden => {
            tracing::warn!(
                path,
                subject = identity.map(|i| i.subject()),
                "access denied: missing required authority"
            );
            return Err(AppError::Forbidden);
        }
    }

    Ok(next.run(req).await)
}
