//! Database connection management using sqlx

use crate::error::{GatewayError, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = PgPool;

pub const DEFAULT_PORT: u16 = 5432;

/// Host, port, credential and database name of the Postgres instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Where the Postgres database lives: a full URL or discrete fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgTarget {
    Url(String),
    Descriptor(ConnectionDescriptor),
}

impl PgTarget {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            PgTarget::Url(url) => PgConnectOptions::from_str(url)
                .map_err(|e| GatewayError::Config(format!("Invalid DATABASE_URL: {}", e))),
            PgTarget::Descriptor(d) => Ok(PgConnectOptions::new()
                .host(&d.host)
                .port(d.port)
                .username(&d.user)
                .password(&d.password)
                .database(&d.database)),
        }
    }
}

/// Open a single connection. Callers own it and close it when done.
pub async fn connect(options: &PgConnectOptions) -> std::result::Result<PgConnection, sqlx::Error> {
    options.connect().await
}

/// Initialize a connection pool for conversation persistence
pub async fn init_pool(options: PgConnectOptions) -> std::result::Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let descriptor = ConnectionDescriptor {
            host: "db.example.com".to_string(),
            port: DEFAULT_PORT,
            user: "postgres".to_string(),
            password: "hunter2".to_string(),
            database: "docs".to_string(),
        };
        let rendered = format!("{:?}", descriptor);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("db.example.com"));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = PgTarget::Url("not a url".to_string()).connect_options().unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
