use crate::config::Config;
use crate::imgbb::ImgbbClient;
use crate::pipeline::{
    FileSource, ProgressSink, RemoteFile, UploadOutcome, UploadPipeline, UploadRequest,
    UploadStage,
};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

/// Shared collaborators handed to every update handler.
pub struct BotContext {
    pub pipeline: UploadPipeline,
    pub host: ImgbbClient,
    pub max_size_mb: u64,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "show the welcome message.")]
    Start,
    #[command(description = "how to use the bot.")]
    Help,
}

/// Run the Telegram long-polling dispatcher until shutdown.
///
/// Commands, photos, and plain text each get their own branch; everything
/// else is ignored. Handler faults are logged and swallowed so a single bad
/// update can never take the dispatcher down.
pub async fn run(config: &Config, pipeline: UploadPipeline, host: ImgbbClient) -> Result<()> {
    let bot = Bot::new(config.bot_token.clone());
    let ctx = Arc::new(BotContext {
        pipeline,
        host,
        max_size_mb: config.max_size_mb,
    });

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(handle_photo))
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_other));

    info!("starting Telegram long polling");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram dispatcher stopped");
    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => welcome_text(ctx.max_size_mb),
        Command::Help => help_text(ctx.max_size_mb),
    };
    if let Err(err) = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        warn!("failed to send command reply: {err}");
    }
    Ok(())
}

async fn handle_photo(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    // Telegram sends several thumbnail sizes; the last entry is the original.
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        debug!("photo message without a sender, ignoring");
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if let Err(err) = bot.send_chat_action(chat_id, ChatAction::UploadPhoto).await {
        debug!("failed to send chat action: {err}");
    }

    let request = UploadRequest {
        user_id: user.id.0,
        file_id: photo.file.id.clone(),
        declared_size: photo.file.size as u64,
    };

    let status = match bot.send_message(chat_id, "⏳ Fetching your image…").await {
        Ok(m) => m,
        Err(err) => {
            error!(
                user_id = request.user_id,
                "failed to open progress message: {err}"
            );
            return Ok(());
        }
    };

    let progress = ProgressMessage {
        bot: bot.clone(),
        chat_id,
        message_id: status.id,
    };
    let source = TelegramFiles { bot: bot.clone() };

    let outcome = ctx
        .pipeline
        .process(&source, &ctx.host, &progress, request)
        .await;

    deliver_outcome(&bot, chat_id, status.id, &outcome).await;
    Ok(())
}

async fn handle_other(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Err(err) = bot
        .send_message(
            msg.chat.id,
            "I only handle image uploads. Please send me a *photo* to upload.",
        )
        .parse_mode(ParseMode::Markdown)
        .await
    {
        warn!("failed to send fallback reply: {err}");
    }
    Ok(())
}

/// Edit the progress message into the terminal result, falling back to a
/// fresh message when the edit is refused.
async fn deliver_outcome(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    outcome: &UploadOutcome,
) {
    let text = outcome_text(outcome);
    if let Err(err) = bot
        .edit_message_text(chat_id, message_id, &text)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        warn!("failed to edit result message: {err}");
        if let Err(err) = bot
            .send_message(chat_id, &text)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            error!("failed to deliver result message: {err}");
        }
    }
}

// ============================================================================
// Pipeline Collaborators
// ============================================================================

/// [`FileSource`] backed by the Telegram Bot API file endpoints.
pub struct TelegramFiles {
    bot: Bot,
}

#[async_trait]
impl FileSource for TelegramFiles {
    async fn resolve(&self, file_id: &str) -> anyhow::Result<RemoteFile> {
        let file = self.bot.get_file(file_id.to_owned()).await?;
        Ok(RemoteFile {
            path: file.path,
            size: file.meta.size as u64,
        })
    }

    async fn fetch(&self, file: &RemoteFile) -> anyhow::Result<Bytes> {
        let mut buf = Vec::with_capacity(file.size as usize);
        self.bot.download_file(&file.path, &mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// [`ProgressSink`] that edits the in-chat status message on each stage
/// transition. Edit failures are logged and ignored; progress is cosmetic.
struct ProgressMessage {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

#[async_trait]
impl ProgressSink for ProgressMessage {
    async fn stage(&self, stage: UploadStage) {
        let text = match stage {
            UploadStage::Downloading => "📥 Downloading your image from Telegram…",
            UploadStage::Uploading => "📤 Uploading to ImgBB… Please wait.",
        };
        if let Err(err) = self
            .bot
            .edit_message_text(self.chat_id, self.message_id, text)
            .await
        {
            debug!("failed to edit progress message: {err}");
        }
    }
}

// ============================================================================
// Reply Texts
// ============================================================================

fn welcome_text(max_mb: u64) -> String {
    format!(
        "Hello! I'm your Image Uploader Bot. 📸\n\n\
         Just send me an image (as a *photo*, not a document) and I will \
         upload it to ImgBB and send you the direct URL.\n\n\
         🚨 *File Limit:* Images must be under {max_mb}MB."
    )
}

fn help_text(max_mb: u64) -> String {
    format!(
        "How to use:\n\
         1. Send a single image to this chat.\n\
         2. Ensure the image is sent as a *Photo* (not compressed as a file).\n\
         3. The file size limit is {max_mb}MB.\n\
         I will reply with the ImgBB link upon successful upload."
    )
}

fn outcome_text(outcome: &UploadOutcome) -> String {
    match outcome {
        Ok(hosted) => format!(
            "✅ *Upload Successful!*\n\n\
             *Direct URL:* `{}`\n\n\
             You can delete this image later using this link: `{}`",
            hosted.url, hosted.delete_url
        ),
        Err(err) => err.user_message(),
    }
}
