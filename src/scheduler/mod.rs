//! In-memory reminder scheduler.
//!
//! One tokio task per job, sleeping until its fire time. The active set
//! lives only in memory; the note store is the source of truth, and
//! `restore` rebuilds the timers from it after a restart. Delivery is
//! best-effort: a failed send is logged and the job still counts as fired.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::db::Note;

/// Delivery callback the scheduler invokes when a job fires.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, owner: i64, payload: &str) -> anyhow::Result<()>;
}

/// Job key unique per (owner, fire time, content), so replaying the same
/// directive cannot arm a duplicate timer.
pub fn job_key(owner: i64, fire_at: i64, payload: &str) -> String {
    format!("{}:{}:{}", owner, fire_at, payload)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Holds the active one-shot timers, keyed by job key.
pub struct ReminderScheduler {
    sink: Arc<dyn ReminderSink>,
    jobs: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl ReminderScheduler {
    pub fn new(sink: Arc<dyn ReminderSink>) -> Self {
        Self {
            sink,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a one-shot job. A fire time already in the past fires
    /// immediately rather than being skipped. Returns false when the key is
    /// already registered (the existing timer stays armed).
    pub async fn schedule(&self, owner: i64, fire_at: i64, payload: &str, key: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(key) {
            debug!("Job {} already scheduled, skipping", key);
            return false;
        }

        let delay_secs = (fire_at - unix_now()).max(0) as u64;
        info!("Scheduling reminder for owner {} in {}s", owner, delay_secs);

        let sink = Arc::clone(&self.sink);
        let jobs_ref = Arc::clone(&self.jobs);
        let payload = payload.to_string();
        let key_owned = key.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;

            if let Err(e) = sink.deliver(owner, &payload).await {
                // Best-effort: the job is fired either way, never retried.
                warn!("Reminder delivery to {} failed: {}", owner, e);
            }

            jobs_ref.lock().await.remove(&key_owned);
        });

        jobs.insert(key.to_string(), handle);
        true
    }

    /// Abort a job that has not fired yet. Returns false for unknown keys.
    ///
    /// No directive cancels reminders today; this exists so a future
    /// delete-of-pending-reminder can be wired in.
    pub async fn cancel(&self, key: &str) -> bool {
        match self.jobs.lock().await.remove(key) {
            Some(handle) => {
                handle.abort();
                debug!("Cancelled job {}", key);
                true
            }
            None => false,
        }
    }

    /// Rebuild timers from the durable store's still-future reminders.
    /// Returns how many jobs were armed.
    pub async fn restore(&self, reminders: &[Note]) -> usize {
        let mut restored = 0;
        for note in reminders {
            let Some(due_at) = note.due_at else { continue };
            let key = job_key(note.owner, due_at, &note.content);
            if self.schedule(note.owner, due_at, &note.content, &key).await {
                restored += 1;
            }
        }
        info!("Restored {} pending reminder(s) from the note store", restored);
        restored
    }

    /// Number of jobs currently armed.
    pub async fn pending_count(&self) -> usize {
        self.jobs.lock().await.len()
    }
}
