//! Outbound messaging port and the incoming command model.

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    payload::{Creator, MessagePayload},
    Result,
};

/// Outbound side of the transport. Telegram is the only implementation.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    async fn leave_chat(&self, chat_id: ChatId) -> Result<()>;
}

/// A slash command addressed to the bot.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub creator: Creator,
    pub name: String,
    /// The message the command replies to, if any.
    pub reply_to: Option<ReplyTarget>,
}

#[derive(Clone, Debug)]
pub struct ReplyTarget {
    pub message_id: MessageId,
    pub message: MessagePayload,
}

/// Lowercase command name of `/cmd@botname args`; arguments are ignored.
pub fn parse_command(text: &str) -> Option<String> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let first = text.split(char::is_whitespace).next().unwrap_or("");
    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();
    if cmd.is_empty() {
        return None;
    }

    Some(cmd)
}
