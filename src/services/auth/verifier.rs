use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::config::JwtKeyMaterial;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("{algorithm:?} requires {expected}")]
    KeyMismatch {
        algorithm: Algorithm,
        expected: &'static str,
    },
}

/// Runs before any claim of an access token is trusted.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<(), VerifyError>;

    /// `false` when tokens are accepted without checking the signature.
    fn is_enforcing(&self) -> bool {
        true
    }
}

/// Accepts every token. Development only; `Config` refuses it in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedTokens;

impl TokenVerifier for UnverifiedTokens {
    fn verify(&self, _token: &str) -> Result<(), VerifyError> {
        Ok(())
    }

    fn is_enforcing(&self) -> bool {
        false
    }
}

/// Signature + `exp`/`nbf`/`iss` (and optionally `aud`) checks via `jsonwebtoken`.
///
/// Debug output never includes the key material.
#[derive(Clone)]
pub struct JwtSignatureVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSignatureVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtSignatureVerifier {
    pub fn new(
        algorithm: Algorithm,
        key: &JwtKeyMaterial,
        issuer: &str,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Result<Self, VerifyError> {
        let decoding_key = decoding_key(algorithm, key)?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            // Keycloak puts "account" etc. in aud; without a configured audience we don't check it.
            None => validation.validate_aud = false,
        }
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

fn decoding_key(algorithm: Algorithm, key: &JwtKeyMaterial) -> Result<DecodingKey, VerifyError> {
    use Algorithm::*;

    let key = match (algorithm, key) {
        (HS256 | HS384 | HS512, JwtKeyMaterial::Secret(secret)) => {
            DecodingKey::from_secret(secret.as_bytes())
        }
        (HS256 | HS384 | HS512, _) => {
            return Err(VerifyError::KeyMismatch {
                algorithm,
                expected: "a shared secret",
            });
        }
        (RS256 | RS384 | RS512 | PS256 | PS384 | PS512, JwtKeyMaterial::PublicKeyPem(pem)) => {
            DecodingKey::from_rsa_pem(pem.as_bytes())?
        }
        (ES256 | ES384, JwtKeyMaterial::PublicKeyPem(pem)) => {
            DecodingKey::from_ec_pem(pem.as_bytes())?
        }
        (EdDSA, JwtKeyMaterial::PublicKeyPem(pem)) => DecodingKey::from_ed_pem(pem.as_bytes())?,
        (_, JwtKeyMaterial::Secret(_)) => {
            return Err(VerifyError::KeyMismatch {
                algorithm,
                expected: "a PEM public key",
            });
        }
    };

    Ok(key)
}

impl TokenVerifier for JwtSignatureVerifier {
    fn verify(&self, token: &str) -> Result<(), VerifyError> {
        // Claims are decoded separately; here we only need the validation side effects.
        jsonwebtoken::decode::<serde_json::Value>(token, &self.decoding_key, &self.validation)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    const ISSUER: &str = "http://localhost:8080/auth/realms/demo";
    const SECRET: &str = "test-secret-with-enough-length-for-hs256";

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn verifier(audience: Option<&str>) -> JwtSignatureVerifier {
        JwtSignatureVerifier::new(
            Algorithm::HS256,
            &JwtKeyMaterial::Secret(SECRET.into()),
            ISSUER,
            audience,
            0,
        )
        .unwrap()
    }

    #[test]
    fn accepts_token_signed_with_configured_secret() {
        let token = sign(
            &json!({ "sub": "u1", "iss": ISSUER, "aud": "account", "exp": now() + 600 }),
            SECRET,
        );

        assert!(verifier(None).verify(&token).is_ok());
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let token = sign(
            &json!({ "sub": "u1", "iss": ISSUER, "exp": now() + 600 }),
            "some-other-secret-of-similar-length!!",
        );

        assert!(matches!(
            verifier(None).verify(&token),
            Err(VerifyError::Jwt(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign(
            &json!({ "sub": "u1", "iss": ISSUER, "exp": now() - 600 }),
            SECRET,
        );

        assert!(verifier(None).verify(&token).is_err());
    }

    #[test]
    fn rejects_foreign_issuer() {
        let token = sign(
            &json!({ "sub": "u1", "iss": "https://evil.example", "exp": now() + 600 }),
            SECRET,
        );

        assert!(verifier(None).verify(&token).is_err());
    }

    #[test]
    fn checks_audience_only_when_configured() {
        let token = sign(
            &json!({ "sub": "u1", "iss": ISSUER, "aud": "account", "exp": now() + 600 }),
            SECRET,
        );

        assert!(verifier(Some("account")).verify(&token).is_ok());
        assert!(verifier(Some("app-demo")).verify(&token).is_err());
    }

    #[test]
    fn rejects_unsigned_compact_token() {
        assert!(verifier(None).verify("abc").is_err());
        assert!(verifier(None).verify("e30.e30").is_err());
    }

    #[test]
    fn mismatched_key_material_is_rejected_at_construction() {
        let err = JwtSignatureVerifier::new(
            Algorithm::RS256,
            &JwtKeyMaterial::Secret(SECRET.into()),
            ISSUER,
            None,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::KeyMismatch { .. }));

        let err = JwtSignatureVerifier::new(
            Algorithm::HS256,
            &JwtKeyMaterial::PublicKeyPem("-----BEGIN PUBLIC KEY-----".into()),
            ISSUER,
            None,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::KeyMismatch { .. }));
    }

    #[test]
    fn unverified_mode_accepts_anything() {
        assert!(UnverifiedTokens.verify("not-even-a-token").is_ok());
        assert!(!UnverifiedTokens.is_enforcing());
    }
}
