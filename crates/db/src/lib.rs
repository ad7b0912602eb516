//! Postgres connection pool factory, repository errors, and migration tooling.

use std::time::Duration;

use anyhow::Context;
use bookshelf_kernel::settings::DatabaseSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions, PgPool};

pub mod error;
pub mod migrate;

pub use error::{RepositoryError, RepositoryResult};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Translate settings into connect options without touching the network.
pub fn connect_options(settings: &DatabaseSettings) -> anyhow::Result<PgConnectOptions> {
    let ssl_mode: PgSslMode = settings
        .sslmode
        .parse()
        .with_context(|| format!("invalid database sslmode '{}'", settings.sslmode))?;

    // Slow-statement warnings stay on either way.
    let statement_level = if settings.debug {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };

    let mut options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .database(&settings.dbname)
        .ssl_mode(ssl_mode)
        .log_statements(statement_level);

    if !settings.password.is_empty() {
        options = options.password(&settings.password);
    }

    Ok(options)
}

/// Open a connection pool and verify connectivity.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let options = connect_options(settings)?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database at {}", settings.address()))?;

    tracing::info!(
        target: "bookshelf-db",
        db = %settings.address(),
        max_connections = settings.max_connections,
        "database pool ready"
    );

    Ok(pool)
}
