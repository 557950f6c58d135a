//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "stockline".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Build a config from `STOCKLINE_DB_URL`, `STOCKLINE_DB_NAMESPACE`,
    /// `STOCKLINE_DB_DATABASE`, `STOCKLINE_DB_USERNAME` and
    /// `STOCKLINE_DB_PASSWORD`, falling back to [`DbConfig::default`]
    /// for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str, default: String| {
            lookup(key).filter(|v| !v.is_empty()).unwrap_or(default)
        };
        Self {
            url: var("STOCKLINE_DB_URL", defaults.url),
            namespace: var("STOCKLINE_DB_NAMESPACE", defaults.namespace),
            database: var("STOCKLINE_DB_DATABASE", defaults.database),
            username: var("STOCKLINE_DB_USERNAME", defaults.username),
            password: var("STOCKLINE_DB_PASSWORD", defaults.password),
        }
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let config = DbConfig::from_lookup(|key| match key {
            "STOCKLINE_DB_URL" => Some("db.internal:8000".into()),
            "STOCKLINE_DB_NAMESPACE" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.url, "db.internal:8000");
        assert_eq!(config.namespace, "stockline");
        assert_eq!(config.database, "main");
    }
}
