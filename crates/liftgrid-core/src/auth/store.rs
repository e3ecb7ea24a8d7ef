//! Best-effort persistence of the credential between runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::warn;

use liftgrid_store::models::keys;
use liftgrid_store::queries::settings;

use super::credential::{AccessToken, Credential};

/// Persisted copy of the credential.
///
/// The copy is a cache: a missing or unreadable credential loads as `None`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, credential: &Credential) -> Result<()>;

    async fn load(&self) -> Option<Credential>;

    async fn clear(&self) -> Result<()>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn CredentialStore) {}
};

/// Stores the credential in the `settings` table.
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn try_load(&self) -> Result<Option<Credential>> {
        let Some(access) = settings::get_setting(&self.pool, keys::ACCESS_TOKEN).await? else {
            return Ok(None);
        };
        let Some(expiry) = settings::get_setting(&self.pool, keys::TOKEN_EXPIRY).await? else {
            return Ok(None);
        };
        let refresh = settings::get_setting(&self.pool, keys::REFRESH_TOKEN)
            .await?
            .filter(|t| !t.is_empty());

        let expiry = DateTime::parse_from_rfc3339(&expiry)
            .with_context(|| format!("stored token expiry is not RFC 3339: {expiry:?}"))?
            .with_timezone(&Utc);

        Ok(Some(Credential {
            access_token: AccessToken::new(access),
            refresh_token: refresh,
            expiry,
        }))
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn save(&self, credential: &Credential) -> Result<()> {
        let expiry = credential.expiry.to_rfc3339();
        let mut entries = vec![
            (keys::ACCESS_TOKEN, credential.access_token.secret()),
            (keys::TOKEN_EXPIRY, expiry.as_str()),
        ];
        match &credential.refresh_token {
            Some(refresh) => entries.push((keys::REFRESH_TOKEN, refresh.as_str())),
            None => {
                settings::delete_settings(&self.pool, &[keys::REFRESH_TOKEN]).await?;
            }
        }
        settings::put_settings(&self.pool, &entries)
            .await
            .context("failed to persist credential")
    }

    async fn load(&self) -> Option<Credential> {
        match self.try_load().await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "ignoring unreadable cached credential");
                None
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        settings::delete_settings(&self.pool, &keys::CREDENTIAL)
            .await
            .context("failed to clear persisted credential")?;
        Ok(())
    }
}

/// In-process store for tests and `--no-cache` style runs.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            inner: Mutex::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.inner.lock().await = Some(credential.clone());
        Ok(())
    }

    async fn load(&self) -> Option<Credential> {
        self.inner.lock().await.clone()
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
