use async_trait::async_trait;
use url::Url;

use super::outcome::AuthFailure;

/// What the user-facing part of the code flow produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOutcome {
    /// The provider redirected back with an authorization code.
    Code(String),
    /// The provider redirected back with an error, or the callback was
    /// unusable (state mismatch, missing code).
    ProviderError {
        error: String,
        description: Option<String>,
    },
    /// The browser could not be opened.
    Blocked { reason: String },
    /// No callback arrived in time.
    TimedOut,
    /// The flow cannot complete inline; the user finishes it out of band.
    RedirectRequired,
}

impl SurfaceOutcome {
    /// The failure this outcome represents, or `None` for [`Self::Code`].
    pub fn into_failure(self, auth_url: &Url) -> Option<AuthFailure> {
        match self {
            Self::Code(_) => None,
            Self::ProviderError { error, description } => {
                Some(AuthFailure::classify(&error, description.as_deref()))
            }
            Self::Blocked { .. } => Some(AuthFailure::PopupBlocked),
            Self::TimedOut => Some(AuthFailure::Timeout),
            Self::RedirectRequired => Some(AuthFailure::RedirectRequired {
                auth_url: auth_url.to_string(),
            }),
        }
    }
}

/// Presents the authorization URL to the user and waits for the result.
#[async_trait]
pub trait AuthorizationSurface: Send + Sync {
    /// Redirect URI registered for this surface. Must be identical in the
    /// authorization request and the code exchange.
    fn redirect_uri(&self) -> String;

    /// Drive the user through `auth_url`. `state` is the anti-forgery value
    /// embedded in the URL; callbacks carrying another value are rejected.
    async fn authorize(&self, auth_url: &Url, state: &str) -> SurfaceOutcome;
}

const _: () = {
    fn _assert_object_safe(_: &dyn AuthorizationSurface) {}
};

/// Never completes inline. The caller shows the URL and later hands the
/// code to [`super::CredentialManager::handle_auth_code`].
pub struct ManualSurface {
    redirect_uri: String,
}

impl ManualSurface {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
        }
    }
}

#[async_trait]
impl AuthorizationSurface for ManualSurface {
    fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    async fn authorize(&self, _auth_url: &Url, _state: &str) -> SurfaceOutcome {
        SurfaceOutcome::RedirectRequired
    }
}
