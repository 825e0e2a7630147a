//! Messaging-platform integrations. Telegram is the only channel today.

pub mod telegram;
