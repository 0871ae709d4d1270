//! Recent-message cache: the raw material quote threads are built from.

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId},
    errors::Error,
    payload::MessagePayload,
    Result,
};

pub mod evictor;
pub mod service;

pub use evictor::{CacheEvictor, EvictorConfig};
pub use service::CacheService;

/// Cached snapshot of one chat message, unique per (chat_id, message_id).
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Message this one replies to, in the same chat. May point at nothing.
    pub reply_id: Option<MessageId>,
    /// Original send time (Unix seconds).
    pub date: i64,
    pub message: MessagePayload,
}

/// Persistent keyed storage for cache entries.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Insert, or overwrite reply link, date and payload of the existing row for the key.
    async fn upsert(&self, entry: CacheEntry) -> Result<()>;

    async fn get(&self, chat_id: ChatId, message_id: MessageId) -> Result<Option<CacheEntry>>;

    /// Replace the stored payload. Returns `false` when no row matched.
    async fn replace_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: MessagePayload,
    ) -> Result<bool>;

    /// Delete every entry with `date <= cutoff`. Returns the number of rows removed.
    async fn delete_dated_up_to(&self, cutoff: i64) -> Result<u64>;

    async fn count(&self) -> Result<u64>;
}

/// A newly received message, as delivered by the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub reply_to: Option<MessageId>,
    pub date: i64,
    pub content: MessagePayload,
}

impl ReceivedMessage {
    pub fn from_payload(content: MessagePayload) -> Result<Self> {
        let chat_id = content
            .chat_id()
            .ok_or_else(|| Error::MalformedPayload("message has no chat.id".to_string()))?;
        let message_id = content
            .message_id()
            .ok_or_else(|| Error::MalformedPayload("message has no message_id".to_string()))?;
        let date = content
            .date()
            .ok_or_else(|| Error::MalformedPayload("message has no date".to_string()))?;

        Ok(Self {
            chat_id,
            message_id,
            reply_to: content.reply_to_message_id(),
            date,
            content,
        })
    }

    pub fn into_entry(self) -> CacheEntry {
        CacheEntry {
            chat_id: self.chat_id,
            message_id: self.message_id,
            reply_id: self.reply_to,
            date: self.date,
            message: self.content,
        }
    }
}

/// An edit of a previously sent message.
#[derive(Clone, Debug, PartialEq)]
pub struct EditedMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub edit_date: i64,
    pub content: MessagePayload,
}

impl EditedMessage {
    pub fn from_payload(content: MessagePayload) -> Result<Self> {
        let chat_id = content
            .chat_id()
            .ok_or_else(|| Error::MalformedPayload("edit has no chat.id".to_string()))?;
        let message_id = content
            .message_id()
            .ok_or_else(|| Error::MalformedPayload("edit has no message_id".to_string()))?;
        let edit_date = content
            .edit_date()
            .or_else(|| content.date())
            .ok_or_else(|| Error::MalformedPayload("edit has no edit_date".to_string()))?;

        Ok(Self {
            chat_id,
            message_id,
            edit_date,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn received_message_requires_identity_and_date() {
        let ok = MessagePayload::from_value(json!({
            "message_id": 2,
            "chat": {"id": 10},
            "date": 5,
            "reply_to_message": {"message_id": 1}
        }))
        .unwrap();
        let msg = ReceivedMessage::from_payload(ok).unwrap();
        assert_eq!(msg.reply_to, Some(MessageId(1)));
        assert_eq!(msg.into_entry().reply_id, Some(MessageId(1)));

        let missing_chat =
            MessagePayload::from_value(json!({"message_id": 2, "date": 5})).unwrap();
        assert!(matches!(
            ReceivedMessage::from_payload(missing_chat),
            Err(Error::MalformedPayload(_))
        ));

        let missing_date =
            MessagePayload::from_value(json!({"message_id": 2, "chat": {"id": 10}})).unwrap();
        assert!(matches!(
            ReceivedMessage::from_payload(missing_date),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn edited_message_falls_back_to_date() {
        let p = MessagePayload::from_value(json!({
            "message_id": 2,
            "chat": {"id": 10},
            "date": 5
        }))
        .unwrap();
        assert_eq!(EditedMessage::from_payload(p).unwrap().edit_date, 5);
    }
}
