//! Composition root: builds the pool, adapters and credential manager that
//! the subcommands share.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;
use tracing::info;

use liftgrid_core::auth::endpoint::{DEFAULT_AUTH_URL, DEFAULT_REVOKE_URL, DEFAULT_TOKEN_URL};
use liftgrid_core::auth::{
    AuthorizationSurface, CredentialManager, LoopbackSurface, ManualSurface, OAuthClient,
    SqliteCredentialStore, loopback_redirect_uri,
};
use liftgrid_core::grid::Grid;
use liftgrid_core::layout::{self, InferredLayout};
use liftgrid_core::sheets::{
    self, CellAddress, CellWriter, CsvExportFetcher, GridFetcher, SheetsValuesWriter, parse_document_url,
};
use liftgrid_core::write::WriteCoordinator;
use liftgrid_store::models::keys;
use liftgrid_store::pool;
use liftgrid_store::queries::settings;

use crate::config::LiftgridConfig;

/// Remote service locations. Tests point these at a local fake.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: String,
    pub export_base: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: sheets::DEFAULT_API_BASE.to_string(),
            export_base: sheets::DEFAULT_EXPORT_BASE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            revoke_url: Some(DEFAULT_REVOKE_URL.to_string()),
        }
    }
}

/// How the interactive flow reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Loopback listener; optionally opens the system browser.
    Loopback { browser: bool },
    /// Print the URL; the code comes back through `liftgrid auth code`.
    Manual,
}

/// A grid together with everything inferred from it.
pub struct LoadedSheet {
    pub document_id: String,
    pub grid: Grid,
    pub layout: InferredLayout,
    /// Top-left cell of the configured range.
    pub origin: CellAddress,
}

pub struct App {
    pub pool: SqlitePool,
    pub config: LiftgridConfig,
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl App {
    /// Open (and migrate) the database named by `config`.
    pub async fn connect(config: LiftgridConfig) -> Result<Self> {
        pool::ensure_database_dir(&config.store_config).await?;
        let db_pool = pool::create_pool(&config.store_config).await?;
        pool::run_migrations(&db_pool).await?;
        let http = sheets::http_client().context("failed to build HTTP client")?;
        Ok(Self::new(db_pool, config, http))
    }

    pub fn new(pool: SqlitePool, config: LiftgridConfig, http: reqwest::Client) -> Self {
        Self {
            pool,
            config,
            http,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    // -- document ------------------------------------------------------------

    /// Id of the configured document.
    pub async fn document_id(&self) -> Result<String> {
        let Some(url) = settings::get_setting(&self.pool, keys::DOCUMENT_URL).await? else {
            bail!("no sheet configured; run `liftgrid sheet set <URL>` first");
        };
        parse_document_url(&url).context("stored document URL is no longer valid")
    }

    /// Fetch a fresh snapshot of the document and infer its layout.
    pub async fn load_sheet(&self) -> Result<LoadedSheet> {
        let document_id = self.document_id().await?;
        let origin = sheets::range_origin(&self.config.range)
            .with_context(|| format!("invalid sheet range {:?}", self.config.range))?;
        let fetcher = CsvExportFetcher::new(self.http.clone())
            .with_export_base(self.endpoints.export_base.clone())
            .with_sheet_name(self.config.sheet_name.clone())
            .with_range(self.config.range.clone());

        let grid = fetcher
            .fetch_grid(&document_id)
            .await
            .with_context(|| format!("failed to fetch document {document_id}"))?;
        let layout = layout::infer(&grid, &self.config.vocabulary)
            .with_context(|| format!("cannot read a workout plan from document {document_id}"))?;

        info!(
            document_id = %document_id,
            exercises = layout.plan.exercise_count(),
            "sheet loaded"
        );
        Ok(LoadedSheet {
            document_id,
            grid,
            layout,
            origin,
        })
    }

    // -- auth ----------------------------------------------------------------

    fn surface(&self, kind: SurfaceKind) -> Arc<dyn AuthorizationSurface> {
        let port = self.config.redirect_port;
        match kind {
            SurfaceKind::Manual => Arc::new(ManualSurface::new(loopback_redirect_uri(port))),
            SurfaceKind::Loopback { browser } => Arc::new(
                LoopbackSurface::new(port)
                    .with_timeout(self.config.auth_timeout)
                    .with_browser(browser)
                    .with_prompt(print_auth_url),
            ),
        }
    }

    /// A credential manager backed by the settings table.
    pub fn credential_manager(&self, kind: SurfaceKind) -> Result<Arc<CredentialManager>> {
        let mut oauth = self.config.oauth_config()?;
        oauth.auth_url = self.endpoints.auth_url.clone();
        oauth.token_url = self.endpoints.token_url.clone();
        oauth.revoke_url = self.endpoints.revoke_url.clone();

        let endpoint = Arc::new(OAuthClient::new(self.http.clone(), oauth.clone()));
        let store = Arc::new(SqliteCredentialStore::new(self.pool.clone()));
        Ok(Arc::new(CredentialManager::new(
            oauth,
            endpoint,
            store,
            self.surface(kind),
        )))
    }

    pub fn credential_store(&self) -> SqliteCredentialStore {
        SqliteCredentialStore::new(self.pool.clone())
    }

    // -- writes --------------------------------------------------------------

    pub fn cell_writer(&self) -> Arc<dyn CellWriter> {
        Arc::new(
            SheetsValuesWriter::new(self.http.clone()).with_api_base(self.endpoints.api_base.clone()),
        )
    }

    pub fn write_coordinator(&self, kind: SurfaceKind) -> Result<WriteCoordinator> {
        Ok(WriteCoordinator::new(
            self.credential_manager(kind)?,
            self.cell_writer(),
        ))
    }
}

fn print_auth_url(url: &str) {
    eprintln!("Open this URL in your browser to authorize liftgrid:\n\n  {url}\n");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::LiftgridConfig;
    use liftgrid_core::layout::Vocabulary;
    use liftgrid_store::config::StoreConfig;
    use liftgrid_test_utils::{FakeGoogle, create_test_pool};
    use std::time::Duration;

    pub const DOC_URL: &str = "https://docs.google.com/spreadsheets/d/DOC123/edit#gid=0";

    pub fn test_config() -> LiftgridConfig {
        LiftgridConfig {
            store_config: StoreConfig::new(StoreConfig::MEMORY_URL),
            client_id: Some("client-id".to_string()),
            client_secret: None,
            redirect_port: 0,
            auth_timeout: Duration::from_secs(1),
            scopes: Vec::new(),
            sheet_name: None,
            range: sheets::DEFAULT_RANGE.to_string(),
            vocabulary: Vocabulary::english(),
        }
    }

    /// An app wired to `fake` with an in-memory database.
    pub async fn test_app(fake: &FakeGoogle) -> App {
        App::new(create_test_pool().await, test_config(), reqwest::Client::new()).with_endpoints(
            Endpoints {
                api_base: fake.base_url(),
                export_base: fake.base_url(),
                auth_url: format!("{}/auth", fake.base_url()),
                token_url: fake.token_url(),
                revoke_url: Some(fake.revoke_url()),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use liftgrid_test_utils::{FakeGoogle, fixtures};

    #[tokio::test]
    async fn document_id_requires_sheet() {
        let fake = FakeGoogle::start().await;
        let app = test_app(&fake).await;
        let err = app.document_id().await.unwrap_err();
        assert!(err.to_string().contains("no sheet configured"), "{err}");
    }

    #[tokio::test]
    async fn load_sheet_fetches_and_infers() {
        let fake = FakeGoogle::start().await;
        fake.publish_csv("DOC123", &fixtures::to_csv(&fixtures::weekly_grid()));
        let app = test_app(&fake).await;
        settings::put_setting(&app.pool, keys::DOCUMENT_URL, DOC_URL)
            .await
            .unwrap();

        let loaded = app.load_sheet().await.unwrap();
        assert_eq!(loaded.document_id, "DOC123");
        assert_eq!(loaded.layout.positions.grid_id(), loaded.grid.id());
        assert!(loaded.layout.plan.exercise_count() >= 4);
    }

    #[tokio::test]
    async fn credential_manager_needs_client_id() {
        let fake = FakeGoogle::start().await;
        let mut app = test_app(&fake).await;
        app.config.client_id = None;
        assert!(app.credential_manager(SurfaceKind::Manual).is_err());
    }
}
