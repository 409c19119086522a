//! Identity provider registration (issuer, client credentials, logout wiring).
//!
//! Read-only after startup and shared freely across requests.
use std::fmt;

use url::Url;

#[derive(Clone)]
pub struct ProviderRegistration {
    issuer_uri: Url,
    client_id: String,
    client_secret: String,
    end_session_endpoint: Url,
    post_logout_redirect_uri: Url,
}

// Do not print the client secret
impl fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("issuer_uri", &self.issuer_uri.as_str())
            .field("client_id", &self.client_id)
            .field("end_session_endpoint", &self.end_session_endpoint.as_str())
            .field("post_logout_redirect_uri", &self.post_logout_redirect_uri.as_str())
            .finish_non_exhaustive()
    }
}

impl ProviderRegistration {
    pub fn new(
        issuer_uri: Url,
        client_id: String,
        client_secret: String,
        end_session_endpoint: Url,
        post_logout_redirect_uri: Url,
    ) -> Self {
        Self {
            issuer_uri,
            client_id,
            client_secret,
            end_session_endpoint,
            post_logout_redirect_uri,
        }
    }

    /// Issuer as it appears in the `iss` claim (no trailing slash).
    pub fn issuer(&self) -> &str {
        self.issuer_uri.as_str().trim_end_matches('/')
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn has_client_secret(&self) -> bool {
        !self.client_secret.is_empty()
    }

    pub fn end_session_endpoint(&self) -> &Url {
        &self.end_session_endpoint
    }

    pub fn post_logout_redirect_uri(&self) -> &Url {
        &self.post_logout_redirect_uri
    }

    /// RP-initiated logout: send the browser to the provider, which redirects
    /// back to `post_logout_redirect_uri` once its own session is gone.
    pub fn logout_url(&self) -> Url {
        let mut url = self.end_session_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair(
                "post_logout_redirect_uri",
                self.post_logout_redirect_uri.as_str(),
            );
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(end_session: &str) -> ProviderRegistration {
        ProviderRegistration::new(
            Url::parse("https://idp.example/auth/realms/demo/").unwrap(),
            "app-demo".into(),
            "s3cr3t-value".into(),
            Url::parse(end_session).unwrap(),
            Url::parse("http://localhost:8081/").unwrap(),
        )
    }

    #[test]
    fn logout_url_carries_client_and_redirect() {
        let url = registration("https://idp.example/auth/realms/demo/protocol/openid-connect/logout")
            .logout_url();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/auth/realms/demo/protocol/openid-connect/logout");
        assert_eq!(
            pairs,
            vec![
                ("client_id".to_string(), "app-demo".to_string()),
                (
                    "post_logout_redirect_uri".to_string(),
                    "http://localhost:8081/".to_string()
                ),
            ]
        );
    }

    #[test]
    fn logout_url_keeps_existing_query() {
        let url = registration("https://idp.example/logout?ui_locales=ja").logout_url();

        assert!(url.query().unwrap().starts_with("ui_locales=ja&client_id=app-demo"));
    }

    #[test]
    fn issuer_has_no_trailing_slash() {
        assert_eq!(
            registration("https://idp.example/logout").issuer(),
            "https://idp.example/auth/realms/demo"
        );
    }

    #[test]
    fn debug_hides_client_secret() {
        let printed = format!("{:?}", registration("https://idp.example/logout"));
        assert!(!printed.contains("s3cr3t-value"));
        assert!(printed.contains("app-demo"));
    }
}
