//! Telegram adapter (teloxide).
//!
//! This crate implements the `wanon-core` MessagingPort over the Telegram Bot API
//! and routes incoming updates into the cache and command handlers.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod convert;
pub mod handlers;
pub mod router;

use wanon_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::warn!(retry_after = ?d, "telegram rate limit hit, retrying once");
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn leave_chat(&self, chat_id: ChatId) -> Result<()> {
        self.with_retry(|| self.bot.leave_chat(Self::tg_chat(chat_id)))
            .await?;
        Ok(())
    }
}
