//! Environment configuration
//!
//! Values come from the process environment after `.env` has been loaded.
//! `from_lookup` takes any key lookup so configuration can be built without
//! touching the real environment.

use crate::db::connection::{ConnectionDescriptor, PgTarget, DEFAULT_PORT};
use crate::error::{GatewayError, Result};
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Postgres(PgTarget),
    Sqlite(PathBuf),
}

#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LlmConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Config("OPENAI_API_KEY must be set".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
}

impl GatewayConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm = LlmConfig {
            api_key: get("OPENAI_API_KEY"),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };

        let database = if let Some(path) = get("DOCSQL_SQLITE_PATH") {
            DatabaseConfig::Sqlite(PathBuf::from(path))
        } else if let Some(url) = get("DATABASE_URL") {
            DatabaseConfig::Postgres(PgTarget::Url(url))
        } else {
            DatabaseConfig::Postgres(PgTarget::Descriptor(descriptor_from(&get)?))
        };

        Ok(Self { llm, database })
    }

    pub fn with_sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = DatabaseConfig::Sqlite(path.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }
}

fn descriptor_from<G>(get: &G) -> Result<ConnectionDescriptor>
where
    G: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        get(key).ok_or_else(|| {
            GatewayError::Config(format!(
                "{} must be set (or provide DATABASE_URL / DOCSQL_SQLITE_PATH)",
                key
            ))
        })
    };

    let port = match get("SUPABASE_PORT") {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| GatewayError::Config(format!("SUPABASE_PORT is not a valid port: {}", raw)))?,
        None => DEFAULT_PORT,
    };

    Ok(ConnectionDescriptor {
        host: required("SUPABASE_HOST")?,
        port,
        user: required("SUPABASE_USER")?,
        password: required("SUPABASE_PASSWORD")?,
        database: required("SUPABASE_DBNAME")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<GatewayConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_descriptor_with_default_port() {
        let cfg = config(&[
            ("SUPABASE_USER", "postgres"),
            ("SUPABASE_PASSWORD", "secret"),
            ("SUPABASE_HOST", "db.example.com"),
            ("SUPABASE_DBNAME", "docs"),
        ])
        .unwrap();

        match cfg.database {
            DatabaseConfig::Postgres(PgTarget::Descriptor(d)) => {
                assert_eq!(d.port, 5432);
                assert_eq!(d.host, "db.example.com");
                assert_eq!(d.database, "docs");
            }
            other => panic!("unexpected database config: {:?}", other),
        }
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.llm.base_url, "https://api.openai.com/v1");
        assert!(cfg.llm.require_api_key().is_err());
    }

    #[test]
    fn test_sqlite_path_wins_over_url() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://u:p@localhost/docs"),
            ("DOCSQL_SQLITE_PATH", "/tmp/docs.db"),
        ])
        .unwrap();
        assert_eq!(cfg.database, DatabaseConfig::Sqlite(PathBuf::from("/tmp/docs.db")));
    }

    #[test]
    fn test_database_url() {
        let cfg = config(&[("DATABASE_URL", "postgres://u:p@localhost/docs"), ("OPENAI_MODEL", "gpt-4o-mini")]).unwrap();
        assert_eq!(
            cfg.database,
            DatabaseConfig::Postgres(PgTarget::Url("postgres://u:p@localhost/docs".to_string()))
        );
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_missing_descriptor_field() {
        let err = config(&[("SUPABASE_USER", "postgres")]).unwrap_err();
        assert!(matches!(err, GatewayError::Config(ref m) if m.contains("SUPABASE_HOST")));
    }

    #[test]
    fn test_bad_port() {
        let err = config(&[
            ("SUPABASE_USER", "postgres"),
            ("SUPABASE_PASSWORD", "secret"),
            ("SUPABASE_HOST", "db"),
            ("SUPABASE_PORT", "abc"),
            ("SUPABASE_DBNAME", "docs"),
        ])
        .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-live"), ("DOCSQL_SQLITE_PATH", "x.db")]).unwrap();
        assert!(!format!("{:?}", cfg).contains("sk-live"));
        assert_eq!(cfg.llm.require_api_key().unwrap(), "sk-live");
    }
}
