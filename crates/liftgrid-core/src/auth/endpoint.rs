//! OAuth2 provider endpoints: authorization URL and token exchange.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::credential::{AccessToken, TokenResponse};
use super::outcome::AuthFailure;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Client registration and provider URLs.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: Option<String>,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Google endpoints and the default scopes for `client_id`.
    pub fn google(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            auth_url: DEFAULT_AUTH_URL.to_owned(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            revoke_url: Some(DEFAULT_REVOKE_URL.to_owned()),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Authorization request URL for the code flow with offline access.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.auth_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The provider answered with a non-success status.
    #[error("token endpoint rejected the request (HTTP {status})")]
    Rejected { status: u16, body: String },

    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned an unexpected body: {0}")]
    Malformed(String),
}

impl EndpointError {
    /// Provider-side failures as an [`AuthFailure`]. `None` for transport
    /// errors, which callers propagate instead.
    pub fn as_failure(&self) -> Option<AuthFailure> {
        match self {
            Self::Rejected { status, body } => Some(AuthFailure::from_error_body(*status, body)),
            Self::Malformed(message) => Some(AuthFailure::Unknown {
                message: message.clone(),
            }),
            Self::Transport(_) => None,
        }
    }
}

/// The provider's token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, EndpointError>;

    /// Obtain a new access token from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, EndpointError>;

    /// Revoke a token at the provider. Endpoints without revocation
    /// support succeed without doing anything.
    async fn revoke(&self, _token: &AccessToken) -> Result<(), EndpointError> {
        Ok(())
    }
}

const _: () = {
    fn _assert_object_safe(_: &dyn TokenEndpoint) {}
};

/// [`TokenEndpoint`] over HTTP form posts.
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, config: OAuthConfig) -> Self {
        Self { http, config }
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse, EndpointError> {
        let mut params: Vec<(&str, &str)> = form.to_vec();
        params.push(("client_id", self.config.client_id.as_str()));
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "token endpoint rejected request");
            return Err(EndpointError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| EndpointError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TokenEndpoint for OAuthClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, EndpointError> {
        self.post_form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, EndpointError> {
        self.post_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn revoke(&self, token: &AccessToken) -> Result<(), EndpointError> {
        let Some(revoke_url) = &self.config.revoke_url else {
            return Ok(());
        };
        let response = self
            .http
            .post(revoke_url)
            .form(&[("token", token.secret())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_has_offline_consent_params() {
        let config = OAuthConfig::google("client-123", None);
        let url = config
            .authorization_url("http://127.0.0.1:8085/oauth2/callback", "abc")
            .unwrap();
        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8085/oauth2/callback");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["prompt"], "consent");
        assert_eq!(pairs["state"], "abc");
        assert_eq!(
            pairs["scope"],
            "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly"
        );
    }

    #[test]
    fn rejected_maps_to_failure_but_transport_does_not() {
        let rejected = EndpointError::Rejected {
            status: 400,
            body: r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#.into(),
        };
        assert_eq!(
            rejected.as_failure().map(|f| f.code()),
            Some("unknown_error")
        );
        let malformed = EndpointError::Malformed("missing field".into());
        assert!(malformed.as_failure().is_some());
    }
}
