//! Assistant core.
//!
//! Drives one incoming message through the pipeline: build prompt with the
//! current local time, call the LLM under a bounded timeout, relay the
//! natural reply, parse the final line as a directive, execute it. Every
//! turn produces at least one user-visible message; an LLM or store
//! failure produces exactly one generic failure reply and no side effect
//! is ever half-reported.

use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::db::NoteRepository;
use crate::directive::DirectiveParser;
use crate::llm::{LlmProvider, PromptPart};
use crate::scheduler::ReminderScheduler;

use super::executor::ActionExecutor;
use super::prompt;

/// Single reply used for any transport, LLM or store failure. No retry:
/// the user re-sends.
pub const FAILURE_REPLY: &str = "Something went wrong while processing that. Please try again.";

pub struct AssistantCore {
    llm: Arc<dyn LlmProvider>,
    parser: DirectiveParser,
    executor: ActionExecutor,
    tz: Tz,
    llm_timeout: Duration,
}

impl AssistantCore {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        notes: NoteRepository,
        scheduler: Arc<ReminderScheduler>,
        tz: Tz,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            parser: DirectiveParser::new(tz),
            executor: ActionExecutor::new(notes, scheduler, tz),
            tz,
            llm_timeout,
        }
    }

    /// Handle a text message; returns the replies to send, in order.
    pub async fn handle_text(&self, owner: i64, text: &str) -> Vec<String> {
        let now = Utc::now().with_timezone(&self.tz);
        let parts = vec![PromptPart::text(prompt::text_prompt(now, text))];
        self.process(owner, parts).await
    }

    /// Handle a voice message already downloaded to raw bytes.
    pub async fn handle_voice(&self, owner: i64, mime_type: &str, audio: Vec<u8>) -> Vec<String> {
        let now = Utc::now().with_timezone(&self.tz);
        let parts = vec![
            PromptPart::text(prompt::voice_prompt(now)),
            PromptPart::audio(mime_type, audio),
        ];
        self.process(owner, parts).await
    }

    async fn process(&self, owner: i64, parts: Vec<PromptPart>) -> Vec<String> {
        let reply_text = match timeout(self.llm_timeout, self.llm.generate(&parts)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!("LLM call failed for owner {}: {}", owner, e);
                return vec![FAILURE_REPLY.to_string()];
            }
            Err(_) => {
                error!(
                    "LLM call timed out after {}s for owner {}",
                    self.llm_timeout.as_secs(),
                    owner
                );
                return vec![FAILURE_REPLY.to_string()];
            }
        };

        let parsed = self.parser.parse_reply(&reply_text);
        debug!("Parsed action for owner {}: {:?}", owner, parsed.action);

        let mut replies = Vec::new();
        if !parsed.natural_reply.is_empty() {
            replies.push(parsed.natural_reply.clone());
        }

        let now = Utc::now().with_timezone(&self.tz);
        match self.executor.execute(owner, parsed.action, now).await {
            Ok(Some(message)) => replies.push(message),
            Ok(None) => {}
            Err(e) => {
                error!("Action execution failed for owner {}: {:#}", owner, e);
                replies.push(FAILURE_REPLY.to_string());
            }
        }

        if replies.is_empty() {
            replies.push(FAILURE_REPLY.to_string());
        }
        replies
    }
}
