use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Tokens expiring within this many seconds are treated as already expired.
pub const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Upper bound on a provider-reported lifetime (one year).
const MAX_LIFETIME_SECS: i64 = 365 * 24 * 3600;

/// Bearer token for API calls. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// An OAuth2 credential with an absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: AccessToken,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl Credential {
    /// Valid if `now` is before `expiry` minus the safety margin.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry - Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Build a credential from a token response received at `now`.
    ///
    /// `previous_refresh` is kept when the provider does not rotate the
    /// refresh token.
    pub fn from_response(
        response: TokenResponse,
        now: DateTime<Utc>,
        previous_refresh: Option<String>,
    ) -> Self {
        let lifetime = response
            .expires_in
            .unwrap_or(DEFAULT_LIFETIME_SECS)
            .clamp(0, MAX_LIFETIME_SECS);
        let expiry = Duration::try_seconds(lifetime)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        Self {
            access_token: AccessToken::new(response.access_token),
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(previous_refresh),
            expiry,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &self.access_token)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "***"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}
