//! Connection pool and database creation.

use crate::config::Config;
use crate::error::{AppError, ConfigError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Database every server has; used to create the target one.
const MAINTENANCE_DB: &str = "postgres";

/// Pool sized from config. Acquisition is bounded by the request timeout.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.request_timeout.min(Duration::from_secs(30)))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Creates the database named by `database_url` when it does not exist yet. The check runs on the
/// maintenance database with the same host, credentials and options.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let Some((maintenance, name)) = maintenance_options(database_url)? else {
        return Ok(());
    };
    let mut conn = maintenance.connect().await?;
    let present: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&name)
        .fetch_one(&mut conn)
        .await?;
    if present {
        tracing::debug!(database = %name, "database present");
        return Ok(());
    }
    sqlx::query(&format!("CREATE DATABASE {}", crate::sql::quoted(&name)))
        .execute(&mut conn)
        .await?;
    tracing::info!(database = %name, "created database");
    Ok(())
}

/// Options for the maintenance database plus the target name, or `None` when the URL names no
/// database or names the maintenance one.
fn maintenance_options(database_url: &str) -> Result<Option<(PgConnectOptions, String)>, ConfigError> {
    let target = PgConnectOptions::from_str(database_url).map_err(|e| ConfigError::DatabaseUrl(e.to_string()))?;
    let name = match target.get_database() {
        Some(name) if !name.is_empty() && name != MAINTENANCE_DB => name.to_string(),
        _ => return Ok(None),
    };
    Ok(Some((target.database(MAINTENANCE_DB), name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgSslMode;

    #[test]
    fn maintenance_database_keeps_host_user_and_options() {
        let (opts, name) = maintenance_options("postgres://tokenizerDB@db.internal:6543/tokenizer?sslmode=disable")
            .unwrap()
            .unwrap();
        assert_eq!(name, "tokenizer");
        assert_eq!(opts.get_database(), Some("postgres"));
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 6543);
        assert_eq!(opts.get_username(), "tokenizerDB");
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Disable));
    }

    #[test]
    fn maintenance_database_itself_needs_nothing() {
        assert!(maintenance_options("postgres://u@localhost/postgres").unwrap().is_none());
    }

    #[test]
    fn unparsable_url_is_a_config_error() {
        let err = maintenance_options("tokenizer").unwrap_err();
        assert!(err.to_string().starts_with("invalid DATABASE_URL"), "{}", err);
    }
}
