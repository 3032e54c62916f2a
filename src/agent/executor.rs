//! Action execution.
//!
//! Maps a parsed `Action` onto the note store and the reminder scheduler.
//! No effect runs from an unvalidated field: the directive parser has
//! already rejected empty content, bad timestamps and non-integer ids, so
//! everything arriving here is safe to persist.

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{Note, NoteRepository};
use crate::directive::Action;
use crate::scheduler::{job_key, ReminderScheduler};

const EMPTY_SECTION: &str = "  (none)";

pub struct ActionExecutor {
    notes: NoteRepository,
    scheduler: Arc<ReminderScheduler>,
    tz: Tz,
}

impl ActionExecutor {
    pub fn new(notes: NoteRepository, scheduler: Arc<ReminderScheduler>, tz: Tz) -> Self {
        Self {
            notes,
            scheduler,
            tz,
        }
    }

    /// Apply one action for `owner`, evaluated at `now`.
    ///
    /// Returns an extra message for the user when the action produces one
    /// (a listing, or a diagnostic for a malformed directive). Store errors
    /// propagate; the orchestrator turns them into the generic failure
    /// reply.
    pub async fn execute(
        &self,
        owner: i64,
        action: Action,
        now: DateTime<Tz>,
    ) -> Result<Option<String>> {
        match action {
            Action::SaveNote { content } => {
                let id = self
                    .notes
                    .insert(owner, &content, None)
                    .await
                    .context("Failed to save note")?;
                info!("Saved note {} for owner {}", id, owner);
                Ok(None)
            }

            Action::ScheduleReminder { content, fire_at } => {
                let due_at = fire_at.timestamp();

                // Durable record first; in-process registration cannot fail,
                // so this order never leaves a job without a backing row.
                let id = self
                    .notes
                    .insert(owner, &content, Some(due_at))
                    .await
                    .context("Failed to persist reminder")?;

                let key = job_key(owner, due_at, &content);
                if !self.scheduler.schedule(owner, due_at, &content, &key).await {
                    debug!("Reminder job {} was already armed", key);
                }

                info!(
                    "Scheduled reminder {} for owner {} at {}",
                    id,
                    owner,
                    fire_at.format("%Y-%m-%d %H:%M:%S")
                );
                Ok(None)
            }

            Action::ListNotes => {
                let now_ts = now.timestamp();
                let pending = self.notes.list_pending(owner, now_ts).await?;
                let completed = self.notes.list_completed(owner, now_ts).await?;
                let simple = self.notes.list_simple(owner).await?;

                Ok(Some(self.render_listing(&pending, &completed, &simple)))
            }

            Action::DeleteNote { id } => {
                // Ownership is not checked here: ids are global and any user
                // may delete any id. Known gap, kept as observed behavior.
                self.notes
                    .delete(id)
                    .await
                    .context("Failed to delete note")?;
                info!("Deleted note {} (requested by owner {})", id, owner);
                Ok(None)
            }

            Action::Conversation => Ok(None),

            Action::Invalid(e) => Ok(Some(format!("(debug: {})", e))),
        }
    }

    /// Three fixed sections, always all present so the user sees the full
    /// structure even when a section is empty.
    fn render_listing(&self, pending: &[Note], completed: &[Note], simple: &[Note]) -> String {
        let mut out = String::new();

        out.push_str("⏰ PENDING REMINDERS:\n");
        out.push_str(&self.render_section(pending, true));

        out.push_str("\n✅ COMPLETED REMINDERS:\n");
        out.push_str(&self.render_section(completed, true));

        out.push_str("\n📝 SIMPLE NOTES:\n");
        out.push_str(&self.render_section(simple, false));

        out
    }

    fn render_section(&self, notes: &[Note], with_due: bool) -> String {
        if notes.is_empty() {
            return format!("{}\n", EMPTY_SECTION);
        }

        let mut out = String::new();
        for note in notes {
            match (with_due, note.due_at) {
                (true, Some(due)) => {
                    let local = DateTime::from_timestamp(due, 0)
                        .map(|dt| dt.with_timezone(&self.tz).format("%d/%m/%Y %H:%M").to_string())
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "  ID {}: {} ({})\n",
                        note.id, note.content, local
                    ));
                }
                _ => out.push_str(&format!("  ID {}: {}\n", note.id, note.content)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::directive::DirectiveError;
    use crate::scheduler::ReminderSink;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::America::Sao_Paulo;
    use tempfile::TempDir;

    struct NullSink;

    #[async_trait]
    impl ReminderSink for NullSink {
        async fn deliver(&self, _owner: i64, _payload: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn setup() -> (TempDir, ActionExecutor, NoteRepository, Arc<ReminderScheduler>) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        let scheduler = Arc::new(ReminderScheduler::new(Arc::new(NullSink)));
        let executor = ActionExecutor::new(db.notes(), Arc::clone(&scheduler), Sao_Paulo);
        (temp_dir, executor, db.notes(), scheduler)
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
        Sao_Paulo.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[tokio::test]
    async fn test_save_note_lands_in_simple_view() {
        let (_tmp, executor, notes, _sched) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);

        let reply = executor
            .execute(
                42,
                Action::SaveNote {
                    content: "buy milk".to_string(),
                },
                now,
            )
            .await
            .unwrap();
        assert!(reply.is_none());

        let simple = notes.list_simple(42).await.unwrap();
        assert_eq!(simple.len(), 1);
        assert_eq!(simple[0].content, "buy milk");
        assert_eq!(simple[0].due_at, None);
    }

    #[tokio::test]
    async fn test_schedule_reminder_persists_and_arms_job() {
        let (_tmp, executor, notes, scheduler) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);
        let fire_at = local(2025, 11, 2, 10, 0, 0);

        executor
            .execute(
                42,
                Action::ScheduleReminder {
                    content: "call dentist".to_string(),
                    fire_at,
                },
                now,
            )
            .await
            .unwrap();

        let pending = notes.list_pending(42, now.timestamp()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].due_at, Some(fire_at.timestamp()));

        assert_eq!(scheduler.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_reminder_classification_flips_after_due_time() {
        let (_tmp, executor, notes, _sched) = setup().await;
        let issued = local(2025, 11, 1, 9, 0, 0);
        let fire_at = local(2025, 11, 2, 10, 0, 0);

        executor
            .execute(
                42,
                Action::ScheduleReminder {
                    content: "call dentist".to_string(),
                    fire_at,
                },
                issued,
            )
            .await
            .unwrap();

        let before = fire_at.timestamp() - 1;
        assert_eq!(notes.list_pending(42, before).await.unwrap().len(), 1);
        assert!(notes.list_completed(42, before).await.unwrap().is_empty());

        let after = fire_at.timestamp() + 1;
        assert!(notes.list_pending(42, after).await.unwrap().is_empty());
        assert_eq!(notes.list_completed(42, after).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_has_all_sections_with_placeholders() {
        let (_tmp, executor, _notes, _sched) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);

        let listing = executor
            .execute(42, Action::ListNotes, now)
            .await
            .unwrap()
            .expect("listing reply");

        assert!(listing.contains("PENDING REMINDERS:"));
        assert!(listing.contains("COMPLETED REMINDERS:"));
        assert!(listing.contains("SIMPLE NOTES:"));
        assert_eq!(listing.matches("(none)").count(), 3);
    }

    #[tokio::test]
    async fn test_listing_shows_entries_with_due_times() {
        let (_tmp, executor, _notes, _sched) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);

        executor
            .execute(
                42,
                Action::SaveNote {
                    content: "buy milk".to_string(),
                },
                now,
            )
            .await
            .unwrap();
        executor
            .execute(
                42,
                Action::ScheduleReminder {
                    content: "call dentist".to_string(),
                    fire_at: local(2025, 11, 2, 10, 0, 0),
                },
                now,
            )
            .await
            .unwrap();

        let listing = executor
            .execute(42, Action::ListNotes, now)
            .await
            .unwrap()
            .expect("listing reply");

        assert!(listing.contains("buy milk"));
        assert!(listing.contains("call dentist (02/11/2025 10:00)"));
        assert_eq!(listing.matches("(none)").count(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_silent_success() {
        let (_tmp, executor, notes, _sched) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);

        notes.insert(42, "keep me", None).await.unwrap();

        let reply = executor
            .execute(42, Action::DeleteNote { id: 7 }, now)
            .await
            .unwrap();
        assert!(reply.is_none());
        assert_eq!(notes.list_simple(42).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_action_yields_diagnostic() {
        let (_tmp, executor, notes, scheduler) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);

        let reply = executor
            .execute(
                42,
                Action::Invalid(DirectiveError::InvalidTimestamp {
                    raw: "2025-13-40 99:99:99".to_string(),
                    reason: "input is out of range".to_string(),
                }),
                now,
            )
            .await
            .unwrap()
            .expect("diagnostic reply");

        // The offending raw value is included, and nothing was stored or armed.
        assert!(reply.contains("2025-13-40 99:99:99"));
        assert!(notes.list_simple(42).await.unwrap().is_empty());
        assert!(notes.list_pending(42, now.timestamp()).await.unwrap().is_empty());
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_conversation_has_no_effect() {
        let (_tmp, executor, notes, _sched) = setup().await;
        let now = local(2025, 11, 1, 9, 0, 0);

        let reply = executor.execute(42, Action::Conversation, now).await.unwrap();
        assert!(reply.is_none());
        assert!(notes.list_simple(42).await.unwrap().is_empty());
    }
}
