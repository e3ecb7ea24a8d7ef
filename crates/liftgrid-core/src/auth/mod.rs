//! OAuth2 credential lifecycle.
//!
//! [`CredentialManager`] owns the credential and its [`AuthState`]. It is
//! wired to three seams: a [`TokenEndpoint`] (the provider), a
//! [`CredentialStore`] (the persisted cache) and an
//! [`AuthorizationSurface`] (how the user is sent through the consent
//! screen).

pub mod credential;
pub mod endpoint;
pub mod loopback;
pub mod manager;
pub mod outcome;
pub mod state;
pub mod store;
pub mod surface;

pub use credential::{AccessToken, Credential, EXPIRY_MARGIN_SECS, TokenResponse};
pub use endpoint::{EndpointError, OAuthClient, OAuthConfig, TokenEndpoint};
pub use loopback::{LoopbackSurface, loopback_redirect_uri};
pub use manager::CredentialManager;
pub use outcome::{AuthError, AuthFailure, AuthResult, TokenSource};
pub use state::{AuthState, AuthStateError};
pub use store::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use surface::{AuthorizationSurface, ManualSurface, SurfaceOutcome};
