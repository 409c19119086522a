/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - Config読み込み → 依存生成 (explicit composition) → Router 組み立て
 * - Middleware の適用 (auth / http)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::auth::{InMemorySessionStore, build_authenticator};
use crate::services::policy::SecurityPolicy;
use crate::state::AppState;
use crate::{api, middleware};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,oauth2_rp_demo=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development では即落として気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting relying party in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;

    tracing::info!(
        issuer = config.provider.issuer(),
        client_id = state.authenticator.client_id(),
        client_secret_configured = config.provider.has_client_secret(),
        end_session_endpoint = %config.provider.end_session_endpoint(),
        post_logout_redirect_uri = %config.provider.post_logout_redirect_uri(),
        sessions = state.sessions.backend_name(),
        "provider registered"
    );
    if !state.authenticator.verifies_signatures() {
        tracing::warn!(
            "AUTH_JWT_ALGORITHM is not set: access token signatures are NOT verified (development only)"
        );
    }

    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    // Process-level services are built once here and shared read-only.
    let authenticator = build_authenticator(config)?;
    let sessions = Arc::new(InMemorySessionStore::new(config.session_max_entries));
    let policy = Arc::new(SecurityPolicy::standard());
    let provider = Arc::new(config.provider.clone());

    Ok(AppState::new(
        authenticator,
        sessions,
        policy,
        provider,
        config.session_ttl_seconds,
    ))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let routes = middleware::auth::apply(api::routes(), state.clone());
    let router = routes.with_state(state);

    middleware::http::apply(router, config)
}
