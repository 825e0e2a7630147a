//! imgrelay relays images received over Telegram to the ImgBB hosting API
//! and replies with the resulting public and deletion URLs. A small axum
//! listener exposes liveness and upload-count information alongside the bot.

pub mod channels;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod imgbb;
pub mod limiter;
pub mod logging;
pub mod pipeline;
pub mod stats;
