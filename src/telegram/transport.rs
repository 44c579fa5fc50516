//! Messaging transport: how audio physically reaches a chat.

use crate::core::error::{AppError, AppResult};
use crate::core::types::ChatTarget;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Recipient};
use teloxide::{ApiError, RequestError};
use url::Url;

/// Audio message that references remote bytes instead of uploading them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAudio {
    /// Direct streaming URL
    pub url: String,
    pub performer: String,
    pub title: String,
    /// Cover art URL
    pub thumbnail: Option<String>,
}

/// Sends audio messages to a chat.
#[async_trait]
pub trait AudioTransport: Send + Sync {
    /// Uploads the file at `path` as an audio message.
    async fn send_audio_file(&self, chat: &ChatTarget, path: &Path) -> AppResult<()>;

    /// Posts an audio message pointing at `audio.url`.
    ///
    /// The Bot API only documents uploaded thumbnails; a URL thumbnail may be
    /// ignored or rejected, in which case the relay resends without it.
    async fn send_audio_link(&self, chat: &ChatTarget, audio: &LinkedAudio) -> AppResult<()>;
}

/// `<bot id>:<secret>` as issued by @BotFather.
pub fn is_well_formed_token(token: &str) -> bool {
    lazy_regex::regex_is_match!(r"^[0-9]{3,}:[A-Za-z0-9_-]{10,}$", token.trim())
}

fn recipient(chat: &ChatTarget) -> Recipient {
    match chat {
        ChatTarget::Id(id) => Recipient::Id(ChatId(*id)),
        ChatTarget::Username(name) if name.starts_with('@') => Recipient::ChannelUsername(name.clone()),
        ChatTarget::Username(name) => Recipient::ChannelUsername(format!("@{}", name)),
    }
}

fn parse_url(raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| AppError::Validation(format!("Bad URL {:?}: {}", raw, e)))
}

/// Telegram Bot API transport.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Builds the bot and checks the token with `getMe`.
    ///
    /// A token that cannot be a bot token is a config error; a token Telegram
    /// refuses is an auth error.
    pub async fn connect(token: &str, timeout: Duration) -> AppResult<Self> {
        if !is_well_formed_token(token) {
            return Err(AppError::Config("Malformed Telegram bot token".to_string()));
        }

        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client build failed: {}", e)))?;
        let bot = Bot::with_client(token.trim(), client);

        match bot.get_me().await {
            Ok(me) => {
                log::info!("Connected to Telegram as @{}", me.username());
                Ok(Self { bot })
            }
            Err(RequestError::Api(ApiError::InvalidToken)) => {
                Err(AppError::Auth("Telegram rejected the bot token".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl AudioTransport for TelegramTransport {
    async fn send_audio_file(&self, chat: &ChatTarget, path: &Path) -> AppResult<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();
        let file = tokio::fs::File::open(path).await?;

        self.bot
            .send_audio(recipient(chat), InputFile::read(file).file_name(file_name))
            .await?;
        Ok(())
    }

    async fn send_audio_link(&self, chat: &ChatTarget, audio: &LinkedAudio) -> AppResult<()> {
        let mut request = self
            .bot
            .send_audio(recipient(chat), InputFile::url(parse_url(&audio.url)?))
            .performer(audio.performer.clone())
            .title(audio.title.clone());
        if let Some(thumbnail) = &audio.thumbnail {
            request = request.thumbnail(InputFile::url(parse_url(thumbnail)?));
        }

        request.await?;
        Ok(())
    }
}
