//! Chat transport.

pub mod telegram;

pub use telegram::{TelegramApi, TelegramBot};
