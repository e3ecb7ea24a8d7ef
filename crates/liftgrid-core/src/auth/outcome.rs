use std::fmt;

use serde::Deserialize;

use super::credential::AccessToken;
use super::state::AuthStateError;

/// Where an authorized token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Memory,
    Cache,
    Refreshed,
    Exchanged,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Memory => "memory",
            Self::Cache => "cache",
            Self::Refreshed => "refreshed",
            Self::Exchanged => "exchanged",
        };
        f.write_str(s)
    }
}

/// Outcome of an authorization attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    Authorized {
        token: AccessToken,
        source: TokenSource,
    },
    Failed(AuthFailure),
}

impl AuthResult {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

/// Every way an authorization attempt can end without a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    AccessDenied,
    VerificationRequired,
    PopupBlocked,
    Timeout,
    /// The flow cannot complete here; the user must open `auth_url`
    /// themselves and hand back the code.
    RedirectRequired { auth_url: String },
    Unknown { message: String },
}

impl AuthFailure {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::VerificationRequired => "verification_required",
            Self::PopupBlocked => "popup_blocked",
            Self::Timeout => "timeout",
            Self::RedirectRequired { .. } => "redirect_required",
            Self::Unknown { .. } => "unknown_error",
        }
    }

    /// Map a provider error (`error` plus optional `error_description`)
    /// to a failure. Verification problems are reported even when the
    /// provider labels them `access_denied`.
    pub fn classify(error: &str, description: Option<&str>) -> Self {
        let text = format!("{error} {}", description.unwrap_or_default()).to_lowercase();
        if text.contains("verification") {
            Self::VerificationRequired
        } else if text.contains("access_denied") {
            Self::AccessDenied
        } else if text.contains("popup_blocked") {
            Self::PopupBlocked
        } else if text.contains("timeout") {
            Self::Timeout
        } else {
            Self::Unknown {
                message: match description {
                    Some(d) if !d.is_empty() => format!("{error}: {d}"),
                    _ => error.to_owned(),
                },
            }
        }
    }

    /// Classify a raw error body from the token endpoint.
    ///
    /// JSON bodies of the form `{"error": .., "error_description": ..}` are
    /// classified by their fields; anything else by the raw text.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
            #[serde(default)]
            error_description: Option<String>,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self::classify(&parsed.error, parsed.error_description.as_deref()),
            Err(_) => match Self::classify(body, None) {
                Self::Unknown { .. } => Self::Unknown {
                    message: format!("token endpoint returned HTTP {status}: {}", body.trim()),
                },
                other => other,
            },
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessDenied => f.write_str("access was denied by the user"),
            Self::VerificationRequired => f.write_str(
                "the OAuth app is unverified; add this account as a test user or verify the app",
            ),
            Self::PopupBlocked => f.write_str("could not open the browser for authorization"),
            Self::Timeout => f.write_str("timed out waiting for the authorization callback"),
            Self::RedirectRequired { auth_url } => {
                write!(f, "open this URL to authorize, then supply the code: {auth_url}")
            }
            Self::Unknown { message } => write!(f, "authorization failed: {message}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no usable credential; run the authorization flow again")]
    ReauthorizationRequired,

    #[error("token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error(transparent)]
    InvalidTransition(#[from] AuthStateError),

    #[error("invalid authorization endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}
