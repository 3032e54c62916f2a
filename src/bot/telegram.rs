//! Telegram Bot Integration
//!
//! Provides a long-polling interface over the Bot API. Messages from
//! authorized users are dispatched to the assistant core; the API half is
//! also the delivery channel the reminder scheduler fires into.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::agent::AssistantCore;
use crate::scheduler::ReminderSink;

/// Telegram caps messages at 4096 chars; cut a little earlier to leave
/// room for the truncation marker.
const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Deserialize, Debug)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Deserialize, Debug)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub voice: Option<Voice>,
    pub from: Option<User>,
}

#[derive(Deserialize, Debug)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Debug)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Voice {
    pub file_id: String,
    pub mime_type: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GetUpdatesResponse {
    ok: bool,
    result: Option<Vec<Update>>,
}

#[derive(Deserialize, Debug)]
struct GetFileResponse {
    ok: bool,
    result: Option<FileInfo>,
}

#[derive(Deserialize, Debug)]
struct FileInfo {
    file_path: Option<String>,
}

/// Thin client over the Bot API. Cheap to clone; the scheduler holds one
/// as its delivery sink.
#[derive(Clone)]
pub struct TelegramApi {
    token: String,
    poll_timeout_secs: u64,
    client: Client,
}

impl TelegramApi {
    pub fn new(token: String, poll_timeout_secs: u64) -> Self {
        Self {
            token,
            poll_timeout_secs,
            // The request timeout must outlive the long-poll hold time.
            client: Client::builder()
                .timeout(Duration::from_secs(poll_timeout_secs + 30))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!(
            "https://api.telegram.org/bot{}/getUpdates?offset={}&timeout={}",
            self.token, offset, self.poll_timeout_secs
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .json::<GetUpdatesResponse>()
            .await?;

        if !response.ok {
            return Err(anyhow::anyhow!("Telegram API returned ok=false"));
        }

        Ok(response.result.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let truncated = truncate_message(text);

        #[derive(Serialize)]
        struct SendMsgReq<'a> {
            chat_id: i64,
            text: &'a str,
        }

        let req = SendMsgReq {
            chat_id,
            text: &truncated,
        };

        self.client.post(&url).json(&req).send().await?;
        Ok(())
    }

    /// Download an attachment into a temp file. The file is deleted when
    /// the returned handle drops, on every exit path.
    pub async fn download_file(&self, file_id: &str) -> Result<NamedTempFile> {
        let url = format!(
            "https://api.telegram.org/bot{}/getFile?file_id={}",
            self.token, file_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .json::<GetFileResponse>()
            .await?;

        if !response.ok {
            return Err(anyhow::anyhow!("Telegram getFile returned ok=false"));
        }

        let file_path = response
            .result
            .and_then(|f| f.file_path)
            .context("Telegram getFile returned no file path")?;

        let download_url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.token, file_path
        );
        let bytes = self.client.get(&download_url).send().await?.bytes().await?;

        let file = NamedTempFile::new().context("Failed to create temp file")?;
        std::fs::write(file.path(), &bytes).context("Failed to write attachment")?;

        Ok(file)
    }
}

#[async_trait]
impl ReminderSink for TelegramApi {
    async fn deliver(&self, owner: i64, payload: &str) -> Result<()> {
        self.send_message(owner, &format!("🔔 ALERT:\n\n- {}", payload))
            .await
    }
}

fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{}...\n\n(truncated)", cut)
}

/// Long-polling bot loop dispatching into the assistant core.
pub struct TelegramBot {
    api: TelegramApi,
    allowed_users: Vec<i64>,
    assistant: Arc<AssistantCore>,
}

impl TelegramBot {
    pub fn new(api: TelegramApi, allowed_users: Vec<i64>, assistant: Arc<AssistantCore>) -> Self {
        Self {
            api,
            allowed_users,
            assistant,
        }
    }

    /// Start the long-polling loop. Blocks the current task.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram long-polling loop...");
        let mut offset = 0;

        loop {
            match self.api.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = update.update_id + 1;
                        if let Some(msg) = update.message {
                            self.handle_message(&msg).await;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to fetch Telegram updates: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    fn is_authorized(&self, user_id: i64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }

    async fn handle_message(&self, msg: &Message) {
        let chat_id = msg.chat.id;

        let user_id = match msg.from.as_ref() {
            Some(u) => u.id,
            None => {
                warn!("Message with no user info - ignoring");
                return;
            }
        };

        if !self.is_authorized(user_id) {
            warn!("Unauthorized user {} attempted to use the bot", user_id);
            let _ = self
                .api
                .send_message(chat_id, "Unauthorized. Access denied.")
                .await;
            return;
        }

        if let Some(text) = &msg.text {
            info!("Received message from {}", user_id);

            if text.starts_with('/') {
                self.handle_command(chat_id, msg, text).await;
                return;
            }

            let _ = self.api.send_message(chat_id, "Processing...").await;
            let replies = self.assistant.handle_text(user_id, text).await;
            self.send_replies(chat_id, replies).await;
        } else if let Some(voice) = &msg.voice {
            info!("Received voice message from {}", user_id);

            let _ = self.api.send_message(chat_id, "Processing...").await;

            let replies = match self.transcribe_input(user_id, voice).await {
                Ok(replies) => replies,
                Err(e) => {
                    error!("Voice handling failed for {}: {:#}", user_id, e);
                    vec![crate::agent::FAILURE_REPLY.to_string()]
                }
            };
            self.send_replies(chat_id, replies).await;
        }
    }

    /// Download the voice attachment and run it through the assistant. The
    /// temp file is dropped (and removed) whether this succeeds or fails.
    async fn transcribe_input(&self, user_id: i64, voice: &Voice) -> Result<Vec<String>> {
        let temp = self.api.download_file(&voice.file_id).await?;
        let audio = std::fs::read(temp.path()).context("Failed to read attachment")?;

        let mime = voice.mime_type.as_deref().unwrap_or("audio/ogg");
        Ok(self.assistant.handle_voice(user_id, mime, audio).await)
    }

    async fn send_replies(&self, chat_id: i64, replies: Vec<String>) {
        for reply in replies {
            if let Err(e) = self.api.send_message(chat_id, &reply).await {
                error!("Failed to send reply to {}: {}", chat_id, e);
            }
        }
    }

    /// Handle built-in bot commands
    async fn handle_command(&self, chat_id: i64, msg: &Message, cmd: &str) {
        let reply = match cmd.split_whitespace().next().unwrap_or("") {
            "/start" => {
                let name = msg
                    .from
                    .as_ref()
                    .and_then(|u| u.first_name.as_deref())
                    .unwrap_or("there");
                format!(
                    "Orion v{} online, {}. Ready for commands.",
                    env!("CARGO_PKG_VERSION"),
                    name
                )
            }
            "/help" => "Talk to me in plain language. I can:\n\
                 - save notes\n\
                 - schedule reminders\n\
                 - list everything I have saved\n\
                 - delete a note by its ID\n\n\
                 Voice messages work too."
                .to_string(),
            _ => format!("Unknown command: {}", cmd),
        };

        if let Err(e) = self.api.send_message(chat_id, &reply).await {
            error!("Failed to send command reply: {}", e);
        }
    }
}
