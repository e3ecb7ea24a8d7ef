//! The credential lifecycle.
//!
//! Resolution order for a usable token: the in-memory credential, then the
//! persisted cache, then a refresh, then (for [`CredentialManager::authenticate`]
//! only) the interactive code flow. Every successful step persists the
//! credential; the in-memory copy always wins while it is valid.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::credential::{AccessToken, Credential};
use super::endpoint::{EndpointError, OAuthConfig, TokenEndpoint};
use super::outcome::{AuthError, AuthFailure, AuthResult, TokenSource};
use super::state::{AuthState, AuthStateError};
use super::store::CredentialStore;
use super::surface::{AuthorizationSurface, SurfaceOutcome};

pub struct CredentialManager {
    config: OAuthConfig,
    endpoint: Arc<dyn TokenEndpoint>,
    store: Arc<dyn CredentialStore>,
    surface: Arc<dyn AuthorizationSurface>,
    credential: RwLock<Option<Credential>>,
    state: Mutex<AuthState>,
}

impl CredentialManager {
    pub fn new(
        config: OAuthConfig,
        endpoint: Arc<dyn TokenEndpoint>,
        store: Arc<dyn CredentialStore>,
        surface: Arc<dyn AuthorizationSurface>,
    ) -> Self {
        Self {
            config,
            endpoint,
            store,
            surface,
            credential: RwLock::new(None),
            state: Mutex::new(AuthState::Unauthenticated),
        }
    }

    // -- state ---------------------------------------------------------------

    pub fn state(&self) -> AuthState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `to`. Staying in the current state is a no-op.
    fn transition(&self, to: AuthState) -> Result<(), AuthStateError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        if from == to {
            return Ok(());
        }
        if !AuthState::is_valid_transition(from, to) {
            return Err(AuthStateError { from, to });
        }
        *state = to;
        debug!(%from, %to, "auth state transition");
        Ok(())
    }

    /// Authorized with an in-memory token outside the expiry margin.
    pub async fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authorized
            && self
                .credential
                .read()
                .await
                .as_ref()
                .is_some_and(Credential::is_valid)
    }

    /// Snapshot of the in-memory credential.
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    // -- public operations ---------------------------------------------------

    /// A valid access token without user interaction.
    ///
    /// Fails with [`AuthError::ReauthorizationRequired`] when neither memory,
    /// cache nor refresh can produce one.
    pub async fn get_valid_token(&self) -> Result<AccessToken, AuthError> {
        let current = self.credential().await;
        if let Some(credential) = current.as_ref().filter(|c| c.is_valid()) {
            return Ok(credential.access_token.clone());
        }

        let mut refresh_token = current.and_then(|c| c.refresh_token);
        if refresh_token.is_none() {
            match self.load_cached().await {
                Cached::Valid(token) => return Ok(token),
                Cached::Expired(rt) => refresh_token = rt,
                Cached::Missing => {}
            }
        }

        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::ReauthorizationRequired);
        };
        match self.refresh_with(refresh_token).await? {
            AuthResult::Authorized { token, .. } => Ok(token),
            AuthResult::Failed(_) => Err(AuthError::ReauthorizationRequired),
        }
    }

    /// Produce a token, falling back to the interactive flow.
    ///
    /// Never calls the refresh endpoint without a refresh token.
    pub async fn authenticate(&self) -> Result<AuthResult, AuthError> {
        let current = self.credential().await;
        if let Some(credential) = current.as_ref().filter(|c| c.is_valid()) {
            self.transition(AuthState::Authorized)?;
            return Ok(AuthResult::Authorized {
                token: credential.access_token.clone(),
                source: TokenSource::Memory,
            });
        }

        if self.state() == AuthState::Authorized {
            debug!("in-memory token expired");
            self.transition(AuthState::Unauthenticated)?;
        }

        let mut refresh_token = current.and_then(|c| c.refresh_token);
        if refresh_token.is_none() {
            match self.load_cached().await {
                Cached::Valid(token) => {
                    return Ok(AuthResult::Authorized {
                        token,
                        source: TokenSource::Cache,
                    });
                }
                Cached::Expired(rt) => refresh_token = rt,
                Cached::Missing => {}
            }
        }

        if let Some(refresh_token) = refresh_token {
            match self.refresh_with(refresh_token).await? {
                authorized @ AuthResult::Authorized { .. } => return Ok(authorized),
                AuthResult::Failed(failure) => {
                    info!(code = failure.code(), "refresh failed, starting interactive authorization");
                }
            }
        }

        self.authorize_interactive().await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Uses the in-memory refresh token, or the cached one when memory has
    /// none.
    pub async fn refresh(&self) -> Result<AuthResult, AuthError> {
        let in_memory = self.credential().await.and_then(|c| c.refresh_token);
        let refresh_token = match in_memory {
            Some(rt) => Some(rt),
            None => self.store.load().await.and_then(|c| c.refresh_token),
        };
        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::ReauthorizationRequired);
        };

        if self.state() == AuthState::Authorizing {
            return Err(AuthStateError {
                from: AuthState::Authorizing,
                to: AuthState::Refreshing,
            }
            .into());
        }
        self.refresh_with(refresh_token).await
    }

    /// Complete a flow whose code was obtained out of band.
    pub async fn handle_auth_code(&self, code: &str) -> Result<AuthResult, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(AuthResult::Failed(AuthFailure::Unknown {
                message: "authorization code is empty".to_owned(),
            }));
        }

        if self.state() == AuthState::Authorized {
            self.transition(AuthState::Unauthenticated)?;
        }
        self.transition(AuthState::Authorizing)?;
        let redirect_uri = self.surface.redirect_uri();
        self.exchange(code, &redirect_uri).await
    }

    /// Drop both copies of the credential and revoke it at the provider.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let previous = self.credential.write().await.take();
        let previous = match previous {
            Some(credential) => Some(credential),
            None => self.store.load().await,
        };

        if let Some(credential) = previous {
            if let Err(e) = self.endpoint.revoke(&credential.access_token).await {
                warn!(error = %e, "token revocation failed; clearing local copies anyway");
            }
        }

        if let Err(e) = self.store.clear().await {
            warn!(error = %format!("{e:#}"), "failed to clear persisted credential");
        }
        self.transition(AuthState::Unauthenticated)?;
        info!("logged out");
        Ok(())
    }

    // -- steps ---------------------------------------------------------------

    /// Load the persisted credential. A valid one is installed and authorizes
    /// immediately; an expired one only contributes its refresh token.
    async fn load_cached(&self) -> Cached {
        let Some(cached) = self.store.load().await else {
            debug!("no cached credential");
            return Cached::Missing;
        };

        if cached.is_valid() {
            let token = cached.access_token.clone();
            *self.credential.write().await = Some(cached);
            if let Err(e) = self.transition(AuthState::Authorized) {
                warn!(error = %e, "cannot mark cached credential authorized");
            }
            info!("using cached credential");
            return Cached::Valid(token);
        }

        debug!(has_refresh = cached.has_refresh_token(), "cached credential expired");
        Cached::Expired(cached.refresh_token.filter(|t| !t.is_empty()))
    }

    async fn refresh_with(&self, refresh_token: String) -> Result<AuthResult, AuthError> {
        self.transition(AuthState::Refreshing)?;
        info!("refreshing access token");

        match self.endpoint.refresh(&refresh_token).await {
            Ok(response) => {
                let credential = Credential::from_response(response, Utc::now(), Some(refresh_token));
                let token = credential.access_token.clone();
                self.install(credential).await;
                self.transition(AuthState::Authorized)?;
                info!("access token refreshed");
                Ok(AuthResult::Authorized {
                    token,
                    source: TokenSource::Refreshed,
                })
            }
            Err(e) => {
                self.transition(AuthState::Unauthenticated)?;
                failed_or_transport(e, "token refresh")
            }
        }
    }

    async fn authorize_interactive(&self) -> Result<AuthResult, AuthError> {
        let redirect_uri = self.surface.redirect_uri();
        let state = random_state();
        let auth_url = self.config.authorization_url(&redirect_uri, &state)?;

        self.transition(AuthState::Authorizing)?;
        info!(redirect_uri = %redirect_uri, "starting interactive authorization");

        let code = match self.surface.authorize(&auth_url, &state).await {
            SurfaceOutcome::Code(code) => code,
            other => {
                let failure = other.into_failure(&auth_url).unwrap_or(AuthFailure::Unknown {
                    message: "authorization returned no code".to_owned(),
                });
                self.transition(AuthState::Unauthenticated)?;
                info!(code = failure.code(), "interactive authorization did not complete");
                return Ok(AuthResult::Failed(failure));
            }
        };

        self.exchange(&code, &redirect_uri).await
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<AuthResult, AuthError> {
        match self.endpoint.exchange_code(code, redirect_uri).await {
            Ok(response) => {
                let credential = Credential::from_response(response, Utc::now(), None);
                if !credential.has_refresh_token() {
                    warn!("provider returned no refresh token; re-authorization will be needed after expiry");
                }
                let token = credential.access_token.clone();
                self.install(credential).await;
                self.transition(AuthState::Authorized)?;
                info!("authorization code exchanged");
                Ok(AuthResult::Authorized {
                    token,
                    source: TokenSource::Exchanged,
                })
            }
            Err(e) => {
                self.transition(AuthState::Unauthenticated)?;
                failed_or_transport(e, "code exchange")
            }
        }
    }

    /// Replace the in-memory credential and persist it.
    async fn install(&self, credential: Credential) {
        if let Err(e) = self.store.save(&credential).await {
            warn!(error = %format!("{e:#}"), "failed to persist credential; continuing with in-memory copy");
        }
        *self.credential.write().await = Some(credential);
    }
}

enum Cached {
    Valid(AccessToken),
    Expired(Option<String>),
    Missing,
}

fn failed_or_transport(error: EndpointError, step: &str) -> Result<AuthResult, AuthError> {
    match error {
        EndpointError::Transport(e) => Err(AuthError::Transport(e)),
        other => {
            warn!(step, error = %other, "token endpoint refused");
            let failure = other.as_failure().unwrap_or_else(|| AuthFailure::Unknown {
                message: other.to_string(),
            });
            Ok(AuthResult::Failed(failure))
        }
    }
}

/// Random anti-forgery value for the authorization request.
fn random_state() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
