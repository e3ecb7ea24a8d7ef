use std::env;
use std::path::PathBuf;

/// Database configuration.
///
/// Reads from the `LIFTGRID_DATABASE_URL` environment variable, falling back
/// to a SQLite file under the platform data directory when unset.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Full SQLite connection URL.
    pub database_url: String,
}

impl StoreConfig {
    /// Connection URL for a private in-memory database (tests, dry runs).
    pub const MEMORY_URL: &str = "sqlite::memory:";

    /// Build a config from the environment.
    ///
    /// Priority: `LIFTGRID_DATABASE_URL` env var, then [`Self::default_url`].
    pub fn from_env() -> Self {
        let database_url =
            env::var("LIFTGRID_DATABASE_URL").unwrap_or_else(|_| Self::default_url());
        Self { database_url }
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// `sqlite://<data_dir>/liftgrid/liftgrid.db`, or a file in the
    /// current directory when no data directory is known.
    pub fn default_url() -> String {
        let path = Self::default_path();
        format!("sqlite://{}", path.display())
    }

    /// Location of the default database file.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("liftgrid"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftgrid.db")
    }

    /// Filesystem path of the database, if the URL points at a file.
    ///
    /// Returns `None` for in-memory databases.
    pub fn database_path(&self) -> Option<PathBuf> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_new() {
        let cfg = StoreConfig::new("sqlite:///tmp/other.db");
        assert_eq!(cfg.database_url, "sqlite:///tmp/other.db");
        assert_eq!(cfg.database_path(), Some(PathBuf::from("/tmp/other.db")));
    }

    #[test]
    fn memory_url_has_no_path() {
        let cfg = StoreConfig::new(StoreConfig::MEMORY_URL);
        assert_eq!(cfg.database_path(), None);
    }

    #[test]
    fn query_string_is_ignored_in_path() {
        let cfg = StoreConfig::new("sqlite://data/lift.db?mode=rwc");
        assert_eq!(cfg.database_path(), Some(PathBuf::from("data/lift.db")));
    }

    #[test]
    fn default_url_points_at_liftgrid_db() {
        let url = StoreConfig::default_url();
        assert!(url.starts_with("sqlite://"), "unexpected url: {url}");
        assert!(url.ends_with("liftgrid.db"), "unexpected url: {url}");
    }
}
