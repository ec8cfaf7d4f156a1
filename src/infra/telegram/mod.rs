//! Digest delivery through the Telegram Bot API.

mod client;

pub use client::TelegramSink;
