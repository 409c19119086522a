use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use super::authority::{Authority, AuthoritySet, extract_authorities};
use super::token::{TokenError, decode_payload};
use super::verifier::{TokenVerifier, VerifyError};

/// Why an authentication attempt ended in the failed state.
///
/// Every variant means the token itself can't be trusted; none of them is
/// downgraded to "authenticated with no authorities".
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error(transparent)]
    InvalidSignature(#[from] VerifyError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token has no 'sub' claim")]
    MissingSubject,

    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
}

/// A fully authenticated principal. Built in one step, never partially populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    subject: String,
    authorities: AuthoritySet,
    expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &AuthoritySet {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &Authority) -> bool {
        self.authorities.contains(authority)
    }

    /// From the token's `exp` claim, if present.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Access token → `Identity`: verify, decode, then map client roles.
#[derive(Clone)]
pub struct Authenticator {
    client_id: String,
    verifier: Arc<dyn TokenVerifier>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_id", &self.client_id)
            .field("enforcing", &self.verifier.is_enforcing())
            .finish()
    }
}

impl Authenticator {
    pub fn new(client_id: impl Into<String>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            client_id: client_id.into(),
            verifier,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_enforcing()
    }

    /// Complete authentication for an exchanged access token.
    ///
    /// `Ok` is the authenticated state with authorities attached; `Err` is the
    /// failed state. There is no in-between. A token whose `exp` is not after
    /// `now` fails, whether or not signatures are verified.
    pub fn complete(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthFailure> {
        self.verifier.verify(access_token)?;

        let payload = decode_payload(access_token)?;

        let subject = payload
            .get("sub")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthFailure::MissingSubject)?
            .to_owned();

        let expires_at = payload
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        if let Some(expired_at) = expires_at.filter(|exp| *exp <= now) {
            return Err(AuthFailure::Expired { expired_at });
        }

        let authorities = extract_authorities(&payload, &self.client_id);

        Ok(Identity {
            subject,
            authorities,
            expires_at,
        })
    }
}

#[cfg(test)]
impl Identity {
    pub(crate) fn for_tests(subject: &str, roles: &[&str]) -> Self {
        Self {
            subject: subject.to_owned(),
            authorities: roles.iter().copied().map(Authority::from_role).collect(),
            expires_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::token::test_support::unsigned_token;
    use crate::services::auth::verifier::UnverifiedTokens;
    use serde_json::json;

    struct RejectAll;

    impl TokenVerifier for RejectAll {
        fn verify(&self, _token: &str) -> Result<(), VerifyError> {
            Err(VerifyError::Jwt(
                jsonwebtoken::errors::ErrorKind::InvalidSignature.into(),
            ))
        }
    }

    fn authenticator() -> Authenticator {
        Authenticator::new("app-demo", Arc::new(UnverifiedTokens))
    }

    #[test]
    fn builds_identity_with_client_authorities() {
        let token = unsigned_token(&json!({
            "sub": "2d0c",
            "exp": 1_900_000_000,
            "resource_access": { "app-demo": { "roles": ["user", "admin"] } }
        }));

        let identity = authenticator().complete(&token, Utc::now()).unwrap();

        assert_eq!(identity.subject(), "2d0c");
        assert!(identity.has_authority(&Authority::from_role("admin")));
        assert!(identity.has_authority(&Authority::from_role("user")));
        assert_eq!(identity.authorities().len(), 2);
        assert_eq!(
            identity.expires_at(),
            DateTime::from_timestamp(1_900_000_000, 0)
        );
    }

    #[test]
    fn token_without_client_roles_authenticates_with_no_authorities() {
        let token = unsigned_token(&json!({
            "sub": "2d0c",
            "resource_access": { "other-app": { "roles": ["admin"] } }
        }));

        let identity = authenticator().complete(&token, Utc::now()).unwrap();

        assert!(identity.authorities().is_empty());
        assert_eq!(identity.expires_at(), None);
    }

    #[test]
    fn structural_token_errors_fail_authentication() {
        assert!(matches!(
            authenticator().complete("abc", Utc::now()),
            Err(AuthFailure::Token(TokenError::MalformedToken { .. }))
        ));
        assert!(matches!(
            authenticator().complete("header.####.sig", Utc::now()),
            Err(AuthFailure::Token(TokenError::Decode(_)))
        ));
        assert!(matches!(
            authenticator().complete("h.bm90IGpzb24.s", Utc::now()),
            Err(AuthFailure::Token(TokenError::Parse(_)))
        ));
    }

    #[test]
    fn missing_subject_fails_authentication() {
        let token = unsigned_token(&json!({
            "resource_access": { "app-demo": { "roles": ["admin"] } }
        }));

        assert!(matches!(
            authenticator().complete(&token, Utc::now()),
            Err(AuthFailure::MissingSubject)
        ));
    }

    #[test]
    fn expired_token_fails_authentication() {
        let now = Utc::now();
        let token = unsigned_token(&json!({
            "sub": "2d0c",
            "exp": now.timestamp() - 3600,
            "resource_access": { "app-demo": { "roles": ["admin"] } }
        }));

        assert!(matches!(
            authenticator().complete(&token, now),
            Err(AuthFailure::Expired { .. })
        ));
    }

    #[test]
    fn token_expiring_exactly_now_is_already_expired() {
        let now = DateTime::from_timestamp(1_900_000_000, 0).unwrap();
        let token = unsigned_token(&json!({ "sub": "2d0c", "exp": 1_900_000_000 }));

        assert!(matches!(
            authenticator().complete(&token, now),
            Err(AuthFailure::Expired { expired_at }) if expired_at == now
        ));
        assert!(authenticator()
            .complete(&token, now - chrono::Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn verifier_runs_before_claims_are_read() {
        let token = unsigned_token(&json!({
            "sub": "2d0c",
            "resource_access": { "app-demo": { "roles": ["admin"] } }
        }));
        let authenticator = Authenticator::new("app-demo", Arc::new(RejectAll));

        assert!(matches!(
            authenticator.complete(&token, Utc::now()),
            Err(AuthFailure::InvalidSignature(_))
        ));
    }
}
