pub mod access;
pub mod gate;

use axum::Router;

use crate::state::AppState;

/// Authentication, then authorization, on every matched route.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // 後から足した layer が外側になる: access → gate → handler
    let router = gate::apply(router, state.clone());
    access::apply(router, state)
}
