//! Command handlers for CLI operations
//!
//! - run: wire everything together and serve until interrupted
//! - doctor: validate configuration, credentials and database access

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::agent::AssistantCore;
use crate::bot::{TelegramApi, TelegramBot};
use crate::config::{Config, GEMINI_API_KEY_VAR, TELEGRAM_TOKEN_VAR};
use crate::db::Database;
use crate::llm::gemini::GeminiProvider;
use crate::scheduler::ReminderScheduler;

fn require_env(var: &str) -> Result<String> {
    std::env::var(var).with_context(|| format!("{} not set. Check your environment or .env file", var))
}

/// Start the bot: open the store, rebuild pending reminders, poll Telegram.
pub async fn handle_run(config: &Config) -> Result<()> {
    let telegram_token = require_env(TELEGRAM_TOKEN_VAR)?;
    let gemini_api_key = require_env(GEMINI_API_KEY_VAR)?;
    let tz = config.timezone()?;

    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;

    let api = TelegramApi::new(telegram_token, config.telegram.poll_timeout_secs);

    // The scheduler delivers through the same API client the bot sends with.
    let scheduler = Arc::new(ReminderScheduler::new(Arc::new(api.clone())));

    // The note store is the source of truth: rebuild the in-memory timer
    // set from every reminder still in the future.
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let reminders = database.notes().list_future_reminders(now).await?;
    scheduler.restore(&reminders).await;

    let llm = Arc::new(GeminiProvider::new(
        config.llm.gemini.clone(),
        gemini_api_key,
        config.llm.timeout_secs,
    ));

    let assistant = Arc::new(AssistantCore::new(
        llm,
        database.notes(),
        Arc::clone(&scheduler),
        tz,
        Duration::from_secs(config.llm.timeout_secs),
    ));

    let bot = TelegramBot::new(api, config.telegram.allowed_users.clone(), assistant);

    info!("Orion is online. Press Ctrl+C to shut down.");
    bot.start_polling().await
}

/// Check everything `run` needs, without starting the loop.
pub async fn handle_doctor(config: &Config) -> Result<()> {
    let mut ok = true;

    match config.timezone() {
        Ok(tz) => println!("Time zone:      {} (ok)", tz),
        Err(e) => {
            ok = false;
            println!("Time zone:      INVALID ({})", e);
        }
    }

    for var in [TELEGRAM_TOKEN_VAR, GEMINI_API_KEY_VAR] {
        if std::env::var(var).is_ok() {
            println!("{:<15} set", format!("{}:", var));
        } else {
            ok = false;
            println!("{:<15} MISSING", format!("{}:", var));
        }
    }

    match Database::new(&config.db_path()).await {
        Ok(db) => {
            println!("Database:       {} (ok)", config.db_path().display());
            db.close().await?;
        }
        Err(e) => {
            ok = false;
            println!("Database:       FAILED ({})", e);
        }
    }

    if ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}
