/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - authenticator / sessions / policy / provider
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{
    auth::{Authenticator, SessionStore},
    policy::SecurityPolicy,
    provider::ProviderRegistration,
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub sessions: Arc<dyn SessionStore>,
    pub policy: Arc<SecurityPolicy>,
    pub provider: Arc<ProviderRegistration>,
    pub session_ttl_seconds: u64,
}

impl AppState {
    pub fn new(
        authenticator: Arc<Authenticator>,
        sessions: Arc<dyn SessionStore>,
        policy: Arc<SecurityPolicy>,
        provider: Arc<ProviderRegistration>,
        session_ttl_seconds: u64,
    ) -> Self {
        Self {
            authenticator,
            sessions,
            policy,
            provider,
            session_ttl_seconds,
        }
    }
}
