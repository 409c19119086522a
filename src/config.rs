/*
 * Responsibility
 * - 環境変数の読み込み (provider registration, token verification, session, HTTP limits)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動後は read-only。Arc で共有する
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::services::provider::ProviderRegistration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Upper bound for `SESSION_TTL_SECONDS` (one year).
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Key used to check access-token signatures.
#[derive(Clone)]
pub enum JwtKeyMaterial {
    PublicKeyPem(String),
    Secret(String),
}

impl fmt::Debug for JwtKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicKeyPem(_) => f.write_str("PublicKeyPem(..)"),
            Self::Secret(_) => f.write_str("Secret(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum JwtVerification {
    /// Claims are trusted as-is. Refused when `APP_ENV=production`.
    Disabled,
    Enabled {
        algorithm: Algorithm,
        key: JwtKeyMaterial,
        audience: Option<String>,
        leeway_seconds: u64,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub provider: ProviderRegistration,
    pub jwt: JwtVerification,

    // Used when the access token carries no `exp`.
    pub session_ttl_seconds: u64,
    pub session_max_entries: usize,

    pub http_timeout_seconds: u64,
    pub http_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source (environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port: u16 = parse_or(get("PORT"), "PORT", 8081)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let issuer_uri = parse_url(&require("OAUTH2_ISSUER_URI")?, "OAUTH2_ISSUER_URI")?;
        let client_id = require("OAUTH2_CLIENT_ID")?;
        let client_secret = require("OAUTH2_CLIENT_SECRET")?;

        // 既定はこのサーバ自身のベース URL
        let post_logout_redirect_uri = match get("OAUTH2_POST_LOGOUT_REDIRECT_URI") {
            Some(v) => parse_url(&v, "OAUTH2_POST_LOGOUT_REDIRECT_URI")?,
            None => parse_url(
                &format!("http://localhost:{}", port),
                "OAUTH2_POST_LOGOUT_REDIRECT_URI",
            )?,
        };

        let end_session_endpoint = match get("OAUTH2_END_SESSION_ENDPOINT") {
            Some(v) => parse_url(&v, "OAUTH2_END_SESSION_ENDPOINT")?,
            None => parse_url(
                &format!(
                    "{}/protocol/openid-connect/logout",
                    issuer_uri.as_str().trim_end_matches('/')
                ),
                "OAUTH2_END_SESSION_ENDPOINT",
            )?,
        };

        let provider = ProviderRegistration::new(
            issuer_uri,
            client_id,
            client_secret,
            end_session_endpoint,
            post_logout_redirect_uri,
        );

        let jwt = match get("AUTH_JWT_ALGORITHM") {
            None => JwtVerification::Disabled,
            Some(alg) => {
                let algorithm = Algorithm::from_str(&alg.to_ascii_uppercase())
                    .map_err(|_| ConfigError::Invalid("AUTH_JWT_ALGORITHM"))?;
                let key = match algorithm {
                    Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                        JwtKeyMaterial::Secret(require("AUTH_JWT_SECRET")?)
                    }
                    _ => JwtKeyMaterial::PublicKeyPem(
                        require("AUTH_JWT_PUBLIC_KEY_PEM")?.replace("\\n", "\n"),
                    ),
                };
                JwtVerification::Enabled {
                    algorithm,
                    key,
                    audience: get("AUTH_JWT_AUDIENCE"),
                    leeway_seconds: parse_or(
                        get("ACCESS_TOKEN_LEEWAY_SECONDS"),
                        "ACCESS_TOKEN_LEEWAY_SECONDS",
                        60,
                    )?,
                }
            }
        };

        if app_env.is_production() && matches!(jwt, JwtVerification::Disabled) {
            return Err(ConfigError::Invalid("AUTH_JWT_ALGORITHM"));
        }

        let session_ttl_seconds: u64 =
            parse_or(get("SESSION_TTL_SECONDS"), "SESSION_TTL_SECONDS", 300)?;
        if session_ttl_seconds == 0 || session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(ConfigError::Invalid("SESSION_TTL_SECONDS"));
        }
        let session_max_entries: usize =
            parse_or(get("SESSION_MAX_ENTRIES"), "SESSION_MAX_ENTRIES", 10_000)?;
        if session_max_entries == 0 {
            return Err(ConfigError::Invalid("SESSION_MAX_ENTRIES"));
        }

        let http_timeout_seconds =
            parse_or(get("HTTP_TIMEOUT_SECONDS"), "HTTP_TIMEOUT_SECONDS", 30)?;
        let http_body_limit_bytes =
            parse_or(get("HTTP_BODY_LIMIT_BYTES"), "HTTP_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            provider,
            jwt,
            session_ttl_seconds,
            session_max_entries,
            http_timeout_seconds,
            http_body_limit_bytes,
        })
    }
}

// A present but unparsable value is an error, never a silent default.
fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::Invalid(key))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::Invalid(key)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use super::{Config, ConfigError};

    pub fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("OAUTH2_ISSUER_URI", "http://localhost:8080/auth/realms/demo".to_string()),
            ("OAUTH2_CLIENT_ID", "app-demo".to_string()),
            ("OAUTH2_CLIENT_SECRET", "e3f519b4-0272-4261-9912-8b7453ac4ecd".to_string()),
        ])
    }

    pub fn config_from(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).cloned())
    }
}
