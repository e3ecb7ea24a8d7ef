//! Authorization through a local HTTP callback.
//!
//! Binds `127.0.0.1:<port>`, opens the system browser on the authorization
//! URL and waits for the provider to redirect to `/oauth2/callback`. The
//! callback and the timeout race; whichever finishes first decides the
//! outcome.

use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::surface::{AuthorizationSurface, SurfaceOutcome};

pub const DEFAULT_PORT: u16 = 8085;
pub const CALLBACK_PATH: &str = "/oauth2/callback";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Opens a URL in the user's browser.
pub type BrowserOpener = fn(&str) -> std::io::Result<()>;

/// Shows the authorization URL to the user before waiting.
pub type UrlPrompt = fn(&str);

fn open_system_browser(url: &str) -> std::io::Result<()> {
    open::that(url)
}

pub struct LoopbackSurface {
    port: u16,
    timeout: Duration,
    launch_browser: bool,
    opener: BrowserOpener,
    prompt: Option<UrlPrompt>,
}

impl LoopbackSurface {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            timeout: DEFAULT_TIMEOUT,
            launch_browser: true,
            opener: open_system_browser,
            prompt: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip opening the browser; the user opens the URL from the prompt.
    pub fn with_browser(mut self, launch: bool) -> Self {
        self.launch_browser = launch;
        self
    }

    pub fn with_opener(mut self, opener: BrowserOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_prompt(mut self, prompt: UrlPrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for LoopbackSurface {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

/// Redirect URI served by a loopback surface on `port`.
pub fn loopback_redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{port}{CALLBACK_PATH}")
}

#[async_trait]
impl AuthorizationSurface for LoopbackSurface {
    fn redirect_uri(&self) -> String {
        loopback_redirect_uri(self.port)
    }

    async fn authorize(&self, auth_url: &Url, state: &str) -> SurfaceOutcome {
        let listener = match TcpListener::bind(("127.0.0.1", self.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!(port = self.port, error = %e, "cannot bind callback port");
                return SurfaceOutcome::RedirectRequired;
            }
        };

        let (tx, mut rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let serve = axum::serve(listener, callback_router(tx))
            .with_graceful_shutdown(shutdown.clone().cancelled_owned());
        let server = tokio::spawn(async move {
            if let Err(e) = serve.await {
                warn!(error = %e, "callback server failed");
            }
        });

        if let Some(prompt) = self.prompt {
            prompt(auth_url.as_str());
        }

        if self.launch_browser {
            if let Err(e) = (self.opener)(auth_url.as_str()) {
                warn!(error = %e, "failed to open browser");
                shutdown.cancel();
                let _ = server.await;
                return SurfaceOutcome::Blocked {
                    reason: e.to_string(),
                };
            }
        }

        info!(
            port = self.port,
            timeout_secs = self.timeout.as_secs(),
            "waiting for authorization callback"
        );

        let outcome = tokio::select! {
            params = rx.recv() => match params {
                Some(params) => params.into_outcome(state),
                None => SurfaceOutcome::ProviderError {
                    error: "callback_closed".to_owned(),
                    description: None,
                },
            },
            () = tokio::time::sleep(self.timeout) => SurfaceOutcome::TimedOut,
        };

        shutdown.cancel();
        let _ = server.await;
        debug!(outcome = outcome_kind(&outcome), "authorization surface finished");
        outcome
    }
}

fn outcome_kind(outcome: &SurfaceOutcome) -> &'static str {
    match outcome {
        SurfaceOutcome::Code(_) => "code",
        SurfaceOutcome::ProviderError { .. } => "provider_error",
        SurfaceOutcome::Blocked { .. } => "blocked",
        SurfaceOutcome::TimedOut => "timed_out",
        SurfaceOutcome::RedirectRequired => "redirect_required",
    }
}

// ---------------------------------------------------------------------------
// Callback handler
// ---------------------------------------------------------------------------

/// Query parameters of the provider redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    fn into_outcome(self, expected_state: &str) -> SurfaceOutcome {
        if let Some(error) = self.error {
            return SurfaceOutcome::ProviderError {
                error,
                description: self.error_description,
            };
        }
        if self.state.as_deref() != Some(expected_state) {
            return SurfaceOutcome::ProviderError {
                error: "state_mismatch".to_owned(),
                description: Some("callback state did not match the request".to_owned()),
            };
        }
        match self.code.filter(|c| !c.is_empty()) {
            Some(code) => SurfaceOutcome::Code(code),
            None => SurfaceOutcome::ProviderError {
                error: "missing_code".to_owned(),
                description: None,
            },
        }
    }
}

fn callback_router(tx: mpsc::Sender<CallbackParams>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback))
        .with_state(tx)
}

async fn callback(
    State(tx): State<mpsc::Sender<CallbackParams>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let failed = params.error.is_some();
    // Only the first callback counts; later ones find the channel full or closed.
    let _ = tx.try_send(params);
    if failed {
        Html("<h1>Authorization failed</h1><p>You can close this window and return to the terminal.</p>")
    } else {
        Html("<h1>Authorization received</h1><p>You can close this window and return to the terminal.</p>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn auth_url() -> Url {
        Url::parse("https://accounts.example/auth").unwrap()
    }

    fn failing_opener(_: &str) -> std::io::Result<()> {
        Err(std::io::Error::other("no display"))
    }

    /// Hit the callback until the surface's server accepts the request.
    async fn send_callback(port: u16, query: &str) {
        let url = format!("http://127.0.0.1:{port}{CALLBACK_PATH}?{query}");
        for _ in 0..50 {
            if reqwest::get(&url).await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("callback server never came up on port {port}");
    }

    #[test]
    fn redirect_uri_uses_loopback_address() {
        assert_eq!(
            LoopbackSurface::new(9000).redirect_uri(),
            "http://127.0.0.1:9000/oauth2/callback"
        );
        assert_eq!(LoopbackSurface::default().port(), DEFAULT_PORT);
    }

    #[test]
    fn callback_params_to_outcome() {
        let ok = CallbackParams {
            code: Some("abc".into()),
            state: Some("s1".into()),
            ..Default::default()
        };
        assert_eq!(ok.clone().into_outcome("s1"), SurfaceOutcome::Code("abc".into()));
        assert!(matches!(
            ok.into_outcome("other"),
            SurfaceOutcome::ProviderError { ref error, .. } if error == "state_mismatch"
        ));

        let denied = CallbackParams {
            error: Some("access_denied".into()),
            ..Default::default()
        };
        assert!(matches!(
            denied.into_outcome("s1"),
            SurfaceOutcome::ProviderError { ref error, .. } if error == "access_denied"
        ));

        let empty = CallbackParams {
            code: Some(String::new()),
            state: Some("s1".into()),
            ..Default::default()
        };
        assert!(matches!(
            empty.into_outcome("s1"),
            SurfaceOutcome::ProviderError { ref error, .. } if error == "missing_code"
        ));
    }

    #[tokio::test]
    async fn router_forwards_first_callback() {
        let (tx, mut rx) = mpsc::channel(1);
        let app = callback_router(tx);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth2/callback?code=c1&state=s")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let params = rx.recv().await.unwrap();
        assert_eq!(params.code.as_deref(), Some("c1"));
        assert_eq!(params.state.as_deref(), Some("s"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (tx, _rx) = mpsc::channel(1);
        let response = callback_router(tx)
            .oneshot(Request::builder().uri("/favicon.ico").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn times_out_without_callback() {
        let surface = LoopbackSurface::new(free_port())
            .with_browser(false)
            .with_timeout(Duration::from_millis(100));
        let outcome = surface.authorize(&auth_url(), "s").await;
        assert_eq!(outcome, SurfaceOutcome::TimedOut);
    }

    #[tokio::test]
    async fn callback_wins_the_race() {
        let port = free_port();
        let surface = LoopbackSurface::new(port)
            .with_browser(false)
            .with_timeout(Duration::from_secs(10));

        let waiter = tokio::spawn(async move { surface.authorize(&auth_url(), "s1").await });
        send_callback(port, "code=the-code&state=s1").await;

        assert_eq!(waiter.await.unwrap(), SurfaceOutcome::Code("the-code".into()));
    }

    #[tokio::test]
    async fn provider_error_is_reported() {
        let port = free_port();
        let surface = LoopbackSurface::new(port)
            .with_browser(false)
            .with_timeout(Duration::from_secs(10));

        let waiter = tokio::spawn(async move { surface.authorize(&auth_url(), "s1").await });
        send_callback(port, "error=access_denied&state=s1").await;

        assert_eq!(
            waiter.await.unwrap(),
            SurfaceOutcome::ProviderError {
                error: "access_denied".into(),
                description: None,
            }
        );
    }

    #[tokio::test]
    async fn occupied_port_requires_redirect() {
        let blocker = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = blocker.local_addr().unwrap().port();
        let surface = LoopbackSurface::new(port).with_browser(false);
        assert_eq!(
            surface.authorize(&auth_url(), "s").await,
            SurfaceOutcome::RedirectRequired
        );
    }

    #[tokio::test]
    async fn browser_failure_is_blocked() {
        let surface = LoopbackSurface::new(free_port())
            .with_opener(failing_opener)
            .with_timeout(Duration::from_secs(10));
        assert_eq!(
            surface.authorize(&auth_url(), "s").await,
            SurfaceOutcome::Blocked {
                reason: "no display".into()
            }
        );
    }
}
