//! Configuration file management for liftgrid.
//!
//! Provides a TOML-based config file at `~/.config/liftgrid/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use liftgrid_core::auth::OAuthConfig;
use liftgrid_core::auth::endpoint::DEFAULT_SCOPES;
use liftgrid_core::auth::loopback::{DEFAULT_PORT, DEFAULT_TIMEOUT};
use liftgrid_core::layout::Vocabulary;
use liftgrid_core::sheets::DEFAULT_RANGE;
use liftgrid_store::config::StoreConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub oauth: OAuthSection,
    #[serde(default)]
    pub sheet: SheetSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: StoreConfig::default_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Port of the loopback redirect listener.
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
    /// How long the interactive flow waits for the browser callback.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_port: default_redirect_port(),
            timeout_secs: default_timeout_secs(),
            scopes: default_scopes(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SheetSection {
    /// Tab to read and write; the first tab when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(default = "default_range")]
    pub range: String,
    /// Label vocabulary: `english` or `russian`.
    #[serde(default = "default_vocabulary")]
    pub vocabulary: String,
}

impl Default for SheetSection {
    fn default() -> Self {
        Self {
            sheet_name: None,
            range: default_range(),
            vocabulary: default_vocabulary(),
        }
    }
}

fn default_redirect_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_range() -> String {
    DEFAULT_RANGE.to_string()
}

fn default_vocabulary() -> String {
    "english".to_string()
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the liftgrid config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/liftgrid` or `~/.config/liftgrid`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("liftgrid");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("liftgrid")
}

/// Return the path to the liftgrid config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. A missing file is `Ok(None)`; a file
/// that exists but does not parse is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold the OAuth client secret.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct LiftgridConfig {
    pub store_config: StoreConfig,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_port: u16,
    pub auth_timeout: Duration,
    pub scopes: Vec<String>,
    pub sheet_name: Option<String>,
    pub range: String,
    pub vocabulary: Vocabulary,
}

impl LiftgridConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `LIFTGRID_DATABASE_URL` > `database.url` > [`StoreConfig::default_url`]
    /// - Client id / secret: `LIFTGRID_CLIENT_ID` / `LIFTGRID_CLIENT_SECRET` > `[oauth]`
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        Self::from_parts(cli_db_url, load_config()?)
    }

    fn from_parts(cli_db_url: Option<&str>, file: Option<ConfigFile>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("LIFTGRID_DATABASE_URL") {
            url
        } else {
            file.database.url
        };

        let client_id = std::env::var("LIFTGRID_CLIENT_ID")
            .ok()
            .or(file.oauth.client_id)
            .filter(|id| !id.trim().is_empty());
        let client_secret = std::env::var("LIFTGRID_CLIENT_SECRET")
            .ok()
            .or(file.oauth.client_secret)
            .filter(|s| !s.is_empty());

        let vocabulary = Vocabulary::by_name(&file.sheet.vocabulary).ok_or_else(|| {
            anyhow!(
                "unknown vocabulary {:?} in config; expected \"english\" or \"russian\"",
                file.sheet.vocabulary
            )
        })?;

        Ok(Self {
            store_config: StoreConfig::new(db_url),
            client_id,
            client_secret,
            redirect_port: file.oauth.redirect_port,
            auth_timeout: Duration::from_secs(file.oauth.timeout_secs),
            scopes: file.oauth.scopes,
            sheet_name: file.sheet.sheet_name.filter(|s| !s.is_empty()),
            range: file.sheet.range,
            vocabulary,
        })
    }

    /// OAuth client registration against the Google endpoints.
    pub fn oauth_config(&self) -> Result<OAuthConfig> {
        let Some(client_id) = self.client_id.as_deref() else {
            bail!(
                "OAuth client id not found; set LIFTGRID_CLIENT_ID or run `liftgrid init --client-id <ID>`"
            );
        };
        let mut config = OAuthConfig::google(client_id, self.client_secret.clone());
        if !self.scopes.is_empty() {
            config.scopes = self.scopes.clone();
        }
        Ok(config)
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
