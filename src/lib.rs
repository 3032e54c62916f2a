//! Orion Library
//!
//! Core functionality of the Orion assistant: a Telegram bot that forwards
//! user messages to an LLM, parses the bracketed directive the model
//! appends to its reply, and executes note and reminder operations against
//! a local SQLite store. Used by the main binary and by integration tests.

/// Configuration management module
pub mod config;

/// CLI definition
pub mod cli;

/// Command handlers wiring the components together
pub mod handlers;

/// Telemetry and logging setup
pub mod telemetry;

/// SQLite persistence module
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// Directive grammar and parsing
pub mod directive;

/// Reminder scheduling
pub mod scheduler;

/// Conversation orchestration and action execution
pub mod agent;

/// Telegram transport module
pub mod bot;
