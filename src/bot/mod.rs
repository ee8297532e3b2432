//! Telegram front end: webhook intake, command handling, and the outbound
//! Bot API client shared with the web upload path.

pub mod client;
pub mod update;
pub mod webhook;

pub use client::{BotClient, BotError, MediaKind};
