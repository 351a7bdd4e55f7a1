// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Catalog reconciliation logic for `PostgresDatabase` resources.
//!
//! Every entry point resolves the owning instance fresh through the injected
//! [`InstanceResolver`], then issues the catalog DDL through the injected
//! [`SqlExecutor`]. Resolution failures are configuration errors that abort
//! the single operation; expected-conflict driver errors (duplicate catalog
//! on create, missing catalog on drop) are treated as the desired state
//! already holding.

use crate::crd::PostgresDatabase;
use crate::handler::{OperationHandler, Outcome};
use crate::resolver::InstanceResolver;
use crate::sql::{
    catalog_count_stmt, create_database_stmt, drop_database_stmt, rename_database_stmt,
    terminate_sessions_stmt, SqlError, SqlExecutor,
};
use crate::state::{object_id, Store};
use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{error, info, warn};

/// Reconciles `PostgresDatabase` resources against the owning instance's
/// live SQL catalogs.
///
/// Generic over the resolver and executor seams so tests can drive it with
/// static fixtures and a recording executor.
pub struct DatabaseHandler<R, S> {
    store: Store<PostgresDatabase>,
    resolver: R,
    sql: S,
}

impl<R, S> DatabaseHandler<R, S>
where
    R: InstanceResolver,
    S: SqlExecutor,
{
    /// Create a handler over an injected tracking store, resolver and
    /// executor.
    #[must_use]
    pub fn new(store: Store<PostgresDatabase>, resolver: R, sql: S) -> Self {
        Self {
            store,
            resolver,
            sql,
        }
    }

    /// The tracked-database store shared with the dispatcher.
    #[must_use]
    pub fn store(&self) -> &Store<PostgresDatabase> {
        &self.store
    }

    /// Create the catalog named by `db`, treating "already exists" as the
    /// desired state already holding.
    async fn create_catalog(&self, db: &PostgresDatabase) -> Result<Outcome> {
        let conn = self.resolver.resolve(db).await?;
        let catalog = &db.spec.db_name;

        match self.sql.execute(&conn, &create_database_stmt(catalog)).await {
            Ok(_) => {
                info!("Catalog {catalog} created on {}", conn.host);
                Ok(Outcome::Applied)
            }
            Err(SqlError::AlreadyExists(_)) => {
                warn!("Catalog {catalog} already exists on {}", conn.host);
                Ok(Outcome::AlreadySatisfied)
            }
            Err(e) => {
                error!("Failed to create catalog {catalog}: {e}");
                Ok(Outcome::FailedNeedsRetry)
            }
        }
    }
}

#[async_trait]
impl<R, S> OperationHandler for DatabaseHandler<R, S>
where
    R: InstanceResolver,
    S: SqlExecutor,
{
    type Resource = PostgresDatabase;

    async fn on_added(&self, db: PostgresDatabase) -> Result<Outcome> {
        let mut tracked = self.store.lock().await;

        let namespace = db.namespace().unwrap_or_default();
        let name = db.name_any();
        info!(
            "PostgresDatabase {namespace}/{name} was ADDED (catalog '{}' on instance '{}')",
            db.spec.db_name, db.spec.instance
        );

        let outcome = self.create_catalog(&db).await?;

        // A failed create leaves the resource untracked so the next event or
        // sweep sees it afresh.
        if outcome != Outcome::FailedNeedsRetry {
            tracked.insert(object_id(&namespace, &name), db);
        }

        Ok(outcome)
    }

    async fn on_updated(&self, db: PostgresDatabase) -> Result<Outcome> {
        let mut tracked = self.store.lock().await;

        let namespace = db.namespace().unwrap_or_default();
        let name = db.name_any();
        let id = object_id(&namespace, &name);

        let previous = tracked
            .get(&id)
            .cloned()
            .expect("on_updated invoked for untracked PostgresDatabase");

        let old_catalog = previous.spec.db_name.clone();
        let new_catalog = db.spec.db_name.clone();

        if old_catalog == new_catalog {
            info!("PostgresDatabase {namespace}/{name} updated, catalog name unchanged");
            tracked.insert(id, db);
            return Ok(Outcome::AlreadySatisfied);
        }

        info!("Renaming catalog {old_catalog} to {new_catalog} for PostgresDatabase {namespace}/{name}");
        let conn = self.resolver.resolve(&db).await?;

        // Active sessions block the rename, so they are terminated first.
        self.sql
            .execute(&conn, &terminate_sessions_stmt(&old_catalog))
            .await?;
        self.sql
            .execute(&conn, &rename_database_stmt(&old_catalog, &new_catalog))
            .await?;

        tracked.insert(id, db);
        info!("Catalog {old_catalog} renamed to {new_catalog}");

        Ok(Outcome::Applied)
    }

    async fn on_deleted(&self, db: PostgresDatabase) -> Result<Outcome> {
        let mut tracked = self.store.lock().await;

        let namespace = db.namespace().unwrap_or_default();
        let name = db.name_any();
        let catalog = &db.spec.db_name;
        info!("PostgresDatabase {namespace}/{name} must be DELETED (catalog '{catalog}')");

        let conn = self.resolver.resolve(&db).await?;

        match self.sql.execute(&conn, &drop_database_stmt(catalog)).await {
            Ok(_) => {
                tracked.remove(&object_id(&namespace, &name));
                info!("Catalog {catalog} dropped from {}", conn.host);
                Ok(Outcome::Applied)
            }
            Err(SqlError::DoesNotExist(_)) => {
                tracked.remove(&object_id(&namespace, &name));
                warn!("Catalog {catalog} was already gone from {}", conn.host);
                Ok(Outcome::AlreadySatisfied)
            }
            Err(e) => {
                // Tracking is kept so a later delete or sweep still sees the
                // catalog as owned.
                error!("Failed to drop catalog {catalog}: {e}");
                Ok(Outcome::FailedNeedsRetry)
            }
        }
    }

    async fn on_bookmarked(&self, db: PostgresDatabase) -> Result<()> {
        warn!("PostgresDatabase {} was BOOKMARKED", db.name_any());
        Ok(())
    }

    async fn on_error(&self, db: PostgresDatabase) -> Result<()> {
        error!("ERROR on PostgresDatabase {}", db.name_any());
        Ok(())
    }

    /// Drift sweep: recreate any tracked catalog missing from its engine.
    ///
    /// Per-resource failures are logged and skipped; one unreachable engine
    /// must not starve the rest of the tracked set.
    async fn check_current_state(&self) -> Result<()> {
        let tracked = self.store.lock().await;

        let databases: Vec<PostgresDatabase> = tracked.values().cloned().collect();
        for db in databases {
            let catalog = &db.spec.db_name;

            let conn = match self.resolver.resolve(&db).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Skipping drift check for catalog {catalog}: {e}");
                    continue;
                }
            };

            let count = match self
                .sql
                .query_scalar(&conn, &catalog_count_stmt(catalog))
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    warn!("Skipping drift check for catalog {catalog}: {e}");
                    continue;
                }
            };

            if count == 0 {
                warn!("Catalog {catalog} is missing from {}, recreating", conn.host);
                match self.create_catalog(&db).await {
                    Ok(Outcome::FailedNeedsRetry) => {
                        warn!("Recreate of catalog {catalog} failed, will retry next sweep");
                    }
                    Ok(_) => info!("Catalog {catalog} restored"),
                    Err(e) => warn!("Recreate of catalog {catalog} failed: {e}"),
                }
            }
        }

        Ok(())
    }
}
