use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use crate::domain::BalanceEntry;

use super::MIGRATION_001_INITIAL;

/// Repository persisting participants and the net balance table.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it is missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Participants
    // ========================

    pub async fn load_participants(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load participants")?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    /// Store a participant; already stored names are ignored.
    pub async fn save_participant(&self, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO users (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save participant '{}'", name))?;
        Ok(())
    }

    // ========================
    // Balances
    // ========================

    pub async fn load_balances(&self) -> Result<Vec<BalanceEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT debtor, creditor, amount_cents
            FROM balances
            ORDER BY debtor, creditor
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load balances")?;

        Ok(rows.iter().map(Self::row_to_balance).collect())
    }

    /// Replace the whole balance table with `entries`.
    /// Runs in one transaction, so a failure keeps the previous rows.
    pub async fn save_all_balances(&self, entries: &[BalanceEntry]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start balance sync")?;

        sqlx::query("DELETE FROM balances")
            .execute(&mut *tx)
            .await
            .context("Failed to clear balances")?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO balances (debtor, creditor, amount_cents)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&entry.debtor)
            .bind(&entry.creditor)
            .bind(entry.amount)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to save balance {} -> {}",
                    entry.debtor, entry.creditor
                )
            })?;
        }

        tx.commit().await.context("Failed to commit balance sync")?;
        Ok(())
    }

    fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> BalanceEntry {
        BalanceEntry {
            debtor: row.get("debtor"),
            creditor: row.get("creditor"),
            amount: row.get("amount_cents"),
        }
    }
}
