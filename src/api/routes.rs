/*
 * Responsibility
 * - URL 構造を定義
 * - 各 route のアクセス要件は services::policy::SecurityPolicy 側 (ここには書かない)
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::handlers::{
    demo::{private, private_admin, public},
    health::health,
    logout::logout,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/public", get(public))
        .route("/private", get(private))
        .route("/private/admin", get(private_admin))
        .route("/logout", get(logout))
}
