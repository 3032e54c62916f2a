//! SQLite persistence.
//!
//! Opens the database with WAL mode for better concurrency, runs idempotent
//! migrations at startup, and hands out repositories over a shared pool.
//! Every mutating call commits before returning, so a crash right after a
//! reply never loses the record behind it.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Row};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub mod notes;

pub use notes::{Note, NoteRepository};

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `db_path` and run migrations.
    ///
    /// WAL mode recovers automatically from unclean shutdowns when the
    /// database is reopened; no extra code is needed for that.
    pub async fn new(db_path: &Path) -> Result<Self> {
        info!("Initializing database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run idempotent migrations, then upgrade legacy tables in place.
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::raw_sql(include_str!("../../migrations/001_notes.sql"))
            .execute(&self.pool)
            .await
            .context("Failed to execute migration 001_notes.sql")?;

        self.ensure_due_at_column().await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Add the `due_at` column to a pre-existing `notes` table that lacks it.
    ///
    /// Databases created before reminders existed have only
    /// `(id, owner, content, created_at)`. `ALTER TABLE ... ADD COLUMN` keeps
    /// every existing row intact; those rows simply read back as plain notes.
    async fn ensure_due_at_column(&self) -> Result<()> {
        let columns = sqlx::query("PRAGMA table_info(notes)")
            .fetch_all(&self.pool)
            .await
            .context("Failed to inspect notes schema")?;

        let has_due_at = columns
            .iter()
            .any(|row| row.get::<String, _>("name") == "due_at");

        if !has_due_at {
            info!("Upgrading notes table: adding due_at column");
            sqlx::query("ALTER TABLE notes ADD COLUMN due_at INTEGER")
                .execute(&self.pool)
                .await
                .context("Failed to add due_at column")?;
        }

        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a note repository backed by this pool
    pub fn notes(&self) -> NoteRepository {
        NoteRepository::new(self.pool.clone())
    }

    /// Flush the WAL and close all connections. Call during shutdown.
    pub async fn close(self) -> Result<()> {
        info!("Closing database connection");

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .context("Failed to flush WAL")?;

        self.pool.close().await;
        Ok(())
    }
}
