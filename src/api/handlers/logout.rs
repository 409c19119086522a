/*
 * Responsibility
 * - GET /logout
 * - 手元の session を破棄し、provider の end-session endpoint へ redirect (RP-initiated logout)
 * - token が無くても / 無効でも redirect する
 */
use axum::{extract::State, response::Redirect};

use crate::api::extractors::AuthCtxExtractor;
use crate::state::AppState;

pub async fn logout(State(state): State<AppState>, ctx: Option<AuthCtxExtractor>) -> Redirect {
    if let Some(AuthCtxExtractor(ctx)) = ctx {
        let removed = state.sessions.remove(&ctx.session_key).await;
        tracing::info!(
            subject = ctx.identity.subject(),
            session = ctx.session_key.short(),
            removed,
            "logout"
        );
    }

    Redirect::to(state.provider.logout_url().as_str())
}
