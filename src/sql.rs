// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! SQL execution seam for catalog provisioning.
//!
//! This module defines the connection descriptor, the statement builders for
//! every DDL operation the reconcilers issue, the [`SqlError`] taxonomy, and
//! the [`SqlExecutor`] trait with its production `tokio-postgres`
//! implementation. Keeping the executor behind a trait lets the database
//! reconciler be tested with a recording mock instead of a live engine.
//!
//! Catalog DDL (`CREATE DATABASE`, `ALTER DATABASE ... RENAME`) cannot take
//! bind parameters, so catalog names are interpolated with
//! [`quote_identifier`] / [`quote_literal`].

use crate::constants::{POSTGRES_PORT, SQL_TIMEOUT_SECS};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;
use tracing::{debug, warn};

/// Connection descriptor for one administrative session against an
/// instance's engine.
///
/// Built fresh by the [`InstanceResolver`](crate::resolver::InstanceResolver)
/// on every operation; never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Resolved engine host (service DNS name or load-balancer ingress).
    pub host: String,
    /// User id decoded from the credentials Secret.
    pub user: String,
    /// Password decoded from the credentials Secret.
    pub password: String,
    /// Administrative catalog to connect to (the instance's initial catalog).
    pub catalog: String,
}

/// Errors surfaced by a [`SqlExecutor`].
///
/// `AlreadyExists` and `DoesNotExist` are the expected-conflict driver
/// errors the reconcilers treat as success/no-op; everything else is an
/// unexpected failure.
#[derive(Debug, Error)]
pub enum SqlError {
    /// Create hit an existing catalog (SQLSTATE 42P04).
    #[error("catalog already exists: {0}")]
    AlreadyExists(String),

    /// Drop or rename referenced a missing catalog (SQLSTATE 3D000).
    #[error("catalog does not exist: {0}")]
    DoesNotExist(String),

    /// Connect or statement exceeded the configured bound. Retryable.
    #[error("SQL operation timed out after {0:?}")]
    Timeout(Duration),

    /// Could not open a connection to the engine.
    #[error("failed to connect to '{host}': {message}")]
    Connect {
        /// Engine host the connection targeted.
        host: String,
        /// Driver-reported cause.
        message: String,
    },

    /// Any other driver-reported error.
    #[error("driver error: {0}")]
    Driver(String),
}

/// Classify a driver error into the [`SqlError`] taxonomy by SQLSTATE.
fn classify(err: &tokio_postgres::Error) -> SqlError {
    match err.code() {
        Some(code) if *code == SqlState::DUPLICATE_DATABASE => {
            SqlError::AlreadyExists(err.to_string())
        }
        Some(code) if *code == SqlState::INVALID_CATALOG_NAME => {
            SqlError::DoesNotExist(err.to_string())
        }
        _ => SqlError::Driver(err.to_string()),
    }
}

/// Quote a catalog name for interpolation into DDL.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string for interpolation into a SQL literal position.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE DATABASE` statement for `catalog`.
#[must_use]
pub fn create_database_stmt(catalog: &str) -> String {
    format!("CREATE DATABASE {}", quote_identifier(catalog))
}

/// `DROP DATABASE` statement for `catalog`.
#[must_use]
pub fn drop_database_stmt(catalog: &str) -> String {
    format!("DROP DATABASE {}", quote_identifier(catalog))
}

/// Statement terminating every session bound to `catalog`.
///
/// PostgreSQL refuses to rename a catalog with active sessions, so the
/// rename sequence issues this first.
#[must_use]
pub fn terminate_sessions_stmt(catalog: &str) -> String {
    format!(
        "SELECT pg_terminate_backend (pid) FROM pg_stat_activity WHERE datname = {}",
        quote_literal(catalog)
    )
}

/// `ALTER DATABASE ... RENAME` statement from `old` to `new`.
#[must_use]
pub fn rename_database_stmt(old: &str, new: &str) -> String {
    format!(
        "ALTER DATABASE {} RENAME TO {}",
        quote_identifier(old),
        quote_identifier(new)
    )
}

/// Scalar query counting live catalogs named `catalog`.
#[must_use]
pub fn catalog_count_stmt(catalog: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM pg_database WHERE datname = {}",
        quote_literal(catalog)
    )
}

/// Executes statements against an engine resolved per operation.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute a non-query statement, returning the affected row count.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SqlError`] on driver failure or timeout.
    async fn execute(&self, conn: &ConnectionInfo, statement: &str) -> Result<u64, SqlError>;

    /// Execute a single-row, single-column scalar query.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SqlError`] on driver failure or timeout.
    async fn query_scalar(&self, conn: &ConnectionInfo, statement: &str) -> Result<i64, SqlError>;
}

/// Production executor on `tokio-postgres`.
///
/// Opens one connection per statement; the reconcilers issue a handful of
/// DDL statements per event, so pooling buys nothing here. Every connect and
/// statement is bounded by the configured timeout so a hung engine cannot
/// hold the kind lock forever.
#[derive(Clone, Debug)]
pub struct PgExecutor {
    timeout: Duration,
}

impl Default for PgExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PgExecutor {
    /// Create an executor with the default statement timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(SQL_TIMEOUT_SECS),
        }
    }

    /// Create an executor with a custom statement timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Open a connection and spawn its driver task.
    async fn connect(&self, conn: &ConnectionInfo) -> Result<tokio_postgres::Client, SqlError> {
        debug!(host = %conn.host, user = %conn.user, catalog = %conn.catalog, "Connecting to engine");

        let mut config = tokio_postgres::Config::new();
        config
            .host(&conn.host)
            .port(POSTGRES_PORT)
            .user(&conn.user)
            .password(&conn.password)
            .dbname(&conn.catalog);

        let (client, connection) = timeout(self.timeout, config.connect(NoTls))
            .await
            .map_err(|_| SqlError::Timeout(self.timeout))?
            .map_err(|e| SqlError::Connect {
                host: conn.host.clone(),
                message: e.to_string(),
            })?;

        // The connection object drives the socket; it resolves once the
        // client is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Engine connection error: {e}");
            }
        });

        Ok(client)
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn execute(&self, conn: &ConnectionInfo, statement: &str) -> Result<u64, SqlError> {
        let client = self.connect(conn).await?;
        timeout(self.timeout, client.execute(statement, &[]))
            .await
            .map_err(|_| SqlError::Timeout(self.timeout))?
            .map_err(|e| classify(&e))
    }

    async fn query_scalar(&self, conn: &ConnectionInfo, statement: &str) -> Result<i64, SqlError> {
        let client = self.connect(conn).await?;
        let row = timeout(self.timeout, client.query_one(statement, &[]))
            .await
            .map_err(|_| SqlError::Timeout(self.timeout))?
            .map_err(|e| classify(&e))?;
        Ok(row.get(0))
    }
}
