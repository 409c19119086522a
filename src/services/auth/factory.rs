/// Factory: build the authentication pipeline from application `Config`.
use std::sync::Arc;

use crate::config::{Config, JwtVerification};
use crate::services::auth::{
    Authenticator,
    verifier::{JwtSignatureVerifier, TokenVerifier, UnverifiedTokens, VerifyError},
};

pub fn build_authenticator(config: &Config) -> Result<Arc<Authenticator>, VerifyError> {
    let verifier: Arc<dyn TokenVerifier> = match &config.jwt {
        JwtVerification::Disabled => Arc::new(UnverifiedTokens),
        JwtVerification::Enabled {
            algorithm,
            key,
            audience,
            leeway_seconds,
        } => Arc::new(JwtSignatureVerifier::new(
            *algorithm,
            key,
            config.provider.issuer(),
            audience.as_deref(),
            *leeway_seconds,
        )?),
    };

    Ok(Arc::new(Authenticator::new(
        config.provider.client_id(),
        verifier,
    )))
}
