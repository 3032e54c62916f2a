//! Conversation orchestration.
//!
//! `core` drives one message through the prompt → LLM → directive →
//! executor pipeline; `executor` maps parsed actions onto the note store
//! and the reminder scheduler; `prompt` builds the persona and toolbox
//! instructions the model answers under.

pub mod core;
pub mod executor;
pub mod prompt;

pub use self::core::{AssistantCore, FAILURE_REPLY};
pub use self::executor::ActionExecutor;
