//! Idempotent schema migrations for the PostgreSQL backend.

use std::collections::HashSet;

use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::info;

use super::schema;

/// Errors raised while applying schema migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration statement failed to execute.
    #[error("Migration '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Applies the schema statements that have not run yet.
///
/// Applied statements are recorded by name in a `_migrations` table, so
/// re-running is a no-op.
pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    /// Creates a runner over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies all pending schema statements, each in its own transaction.
    pub async fn run_migrations(&self) -> Result<(), MigrationError> {
        self.ensure_migrations_table().await?;
        let applied = self.applied_names().await?;

        for (name, sql) in schema::versioned_statements() {
            if applied.contains(name) {
                continue;
            }
            self.apply(name, sql).await?;
            info!(migration = name, "migration applied");
        }

        Ok(())
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                name VARCHAR(255) PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn applied_names(&self) -> Result<HashSet<String>, MigrationError> {
        let rows = sqlx::query("SELECT name FROM _migrations")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    /// Runs one statement and records it atomically, so a failure leaves
    /// the migration unrecorded and retryable.
    async fn apply(&self, name: &str, sql: &str) -> Result<(), MigrationError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Failed {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        sqlx::query("INSERT INTO _migrations (name) VALUES ($1)")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
