//! Note persistence operations.
//!
//! A note is one durable record owned by a user. A note with `due_at` set is
//! a reminder: still pending while `due_at` lies in the future, completed
//! once it is now or past. A note without `due_at` is a plain memo.
//! Rows are only ever inserted or deleted, never updated in place.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

/// One stored note or reminder. Timestamps are UNIX seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: i64,
    pub owner: i64,
    pub content: String,
    pub created_at: i64,
    pub due_at: Option<i64>,
}

fn map_note(row: &sqlx::sqlite::SqliteRow) -> Note {
    Note {
        id: row.get("id"),
        owner: row.get("owner"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        due_at: row.get("due_at"),
    }
}

/// Repository over the `notes` table.
pub struct NoteRepository {
    pool: SqlitePool,
}

impl NoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a note and return its assigned id.
    ///
    /// `created_at` is set here, not by the caller.
    pub async fn insert(&self, owner: i64, content: &str, due_at: Option<i64>) -> Result<i64> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        let result = sqlx::query(
            "INSERT INTO notes (owner, content, created_at, due_at) VALUES (?, ?, ?, ?)",
        )
        .bind(owner)
        .bind(content)
        .bind(now)
        .bind(due_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert note")?;

        Ok(result.last_insert_rowid())
    }

    /// Reminders not yet due, soonest first: the order a user scans
    /// "what's next" in.
    pub async fn list_pending(&self, owner: i64, now: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT id, owner, content, created_at, due_at FROM notes
             WHERE owner = ? AND due_at IS NOT NULL AND due_at > ?
             ORDER BY due_at ASC",
        )
        .bind(owner)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pending reminders")?;

        Ok(rows.iter().map(map_note).collect())
    }

    /// Reminders already due (`due_at <= now`), most recent first.
    pub async fn list_completed(&self, owner: i64, now: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT id, owner, content, created_at, due_at FROM notes
             WHERE owner = ? AND due_at IS NOT NULL AND due_at <= ?
             ORDER BY due_at DESC",
        )
        .bind(owner)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list completed reminders")?;

        Ok(rows.iter().map(map_note).collect())
    }

    /// Plain notes (no due time), newest first.
    pub async fn list_simple(&self, owner: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT id, owner, content, created_at, due_at FROM notes
             WHERE owner = ? AND due_at IS NULL
             ORDER BY id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list notes")?;

        Ok(rows.iter().map(map_note).collect())
    }

    /// Every still-future reminder across all owners, soonest first.
    ///
    /// The note store is the source of truth for scheduler recovery: the
    /// in-memory timer set is rebuilt from this query at startup.
    pub async fn list_future_reminders(&self, now: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT id, owner, content, created_at, due_at FROM notes
             WHERE due_at IS NOT NULL AND due_at > ?
             ORDER BY due_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list reminders for recovery")?;

        Ok(rows.iter().map(map_note).collect())
    }

    /// Delete a note by id. Deleting an id that does not exist is a no-op.
    pub async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete note")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, NoteRepository) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        let repo = db.notes();
        (temp_dir, repo)
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let (_tmp, repo) = setup().await;

        let first = repo.insert(42, "one", None).await.unwrap();
        let second = repo.insert(42, "two", None).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_simple_notes_newest_first() {
        let (_tmp, repo) = setup().await;

        repo.insert(42, "first", None).await.unwrap();
        repo.insert(42, "second", None).await.unwrap();
        repo.insert(99, "someone else", None).await.unwrap();

        let notes = repo.list_simple(42).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "second");
        assert_eq!(notes[1].content, "first");
    }

    #[tokio::test]
    async fn test_pending_completed_partition_at_boundary() {
        let (_tmp, repo) = setup().await;
        let now = 1_000_000;

        repo.insert(42, "future", Some(now + 60)).await.unwrap();
        repo.insert(42, "exactly now", Some(now)).await.unwrap();
        repo.insert(42, "past", Some(now - 60)).await.unwrap();

        let pending = repo.list_pending(42, now).await.unwrap();
        let completed = repo.list_completed(42, now).await.unwrap();

        // due_at == now counts as completed, not pending.
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content, "future");
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].content, "exactly now");
        assert_eq!(completed[1].content, "past");
    }

    #[tokio::test]
    async fn test_pending_ordered_soonest_first() {
        let (_tmp, repo) = setup().await;
        let now = 1_000_000;

        repo.insert(42, "later", Some(now + 300)).await.unwrap();
        repo.insert(42, "soon", Some(now + 30)).await.unwrap();
        repo.insert(42, "middle", Some(now + 120)).await.unwrap();

        let pending = repo.list_pending(42, now).await.unwrap();
        let contents: Vec<&str> = pending.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["soon", "middle", "later"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_tmp, repo) = setup().await;

        let id = repo.insert(42, "doomed", None).await.unwrap();
        repo.delete(id).await.unwrap();

        assert!(repo.list_simple(42).await.unwrap().is_empty());

        // Second delete of the same id is not an error.
        repo.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_from_all_views() {
        let (_tmp, repo) = setup().await;
        let now = 1_000_000;

        let pending = repo.insert(42, "pending", Some(now + 60)).await.unwrap();
        let completed = repo.insert(42, "done", Some(now - 60)).await.unwrap();
        let simple = repo.insert(42, "memo", None).await.unwrap();

        repo.delete(pending).await.unwrap();
        repo.delete(completed).await.unwrap();
        repo.delete(simple).await.unwrap();

        assert!(repo.list_pending(42, now).await.unwrap().is_empty());
        assert!(repo.list_completed(42, now).await.unwrap().is_empty());
        assert!(repo.list_simple(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_reminders_span_owners() {
        let (_tmp, repo) = setup().await;
        let now = 1_000_000;

        repo.insert(1, "alice reminder", Some(now + 60)).await.unwrap();
        repo.insert(2, "bob reminder", Some(now + 30)).await.unwrap();
        repo.insert(1, "already fired", Some(now - 10)).await.unwrap();
        repo.insert(1, "memo", None).await.unwrap();

        let future = repo.list_future_reminders(now).await.unwrap();
        assert_eq!(future.len(), 2);
        assert_eq!(future[0].content, "bob reminder");
        assert_eq!(future[1].content, "alice reminder");
    }
}
