//! Saved quotes: immutable threads of messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, QuoteId},
    errors::Error,
    payload::{Creator, MessagePayload},
    Result,
};

pub mod builder;
pub mod render;
pub mod service;

pub use builder::{Thread, ThreadBuilder};
pub use render::{render, render_with_date};
pub use service::{QuoteService, SaveQuoteRequest};

#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub id: QuoteId,
    pub creator: Creator,
    pub chat_id: ChatId,
    pub created_at: DateTime<Utc>,
    /// Sorted by `order`, oldest message first.
    pub entries: Vec<QuoteEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuoteEntry {
    pub order: u32,
    pub message: MessagePayload,
}

/// A quote that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewQuote {
    pub creator: Creator,
    pub chat_id: ChatId,
    /// Message snapshots, oldest first. Position becomes the entry order.
    pub messages: Vec<MessagePayload>,
}

impl NewQuote {
    pub fn from_thread(creator: Creator, thread: Thread) -> Self {
        Self {
            creator,
            chat_id: thread.chat_id,
            messages: thread.entries.into_iter().map(|e| e.message).collect(),
        }
    }

    /// Stores must call this before writing anything.
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(Error::InvalidInput(
                "cannot store quote with no entries".to_string(),
            ));
        }
        Ok(())
    }
}

/// Durable storage for quotes and their entries.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Persist the quote and all entries atomically. Empty quotes fail with `InvalidInput`.
    async fn insert(&self, quote: NewQuote) -> Result<Quote>;

    async fn get_by_id(&self, id: QuoteId) -> Result<Option<Quote>>;

    /// A uniformly random quote of the chat, `None` if the chat has none.
    async fn random_for_chat(&self, chat_id: ChatId) -> Result<Option<Quote>>;

    async fn count_for_chat(&self, chat_id: ChatId) -> Result<u64>;

    /// Remove the quote together with its entries. Returns `false` if it did not exist.
    async fn delete(&self, id: QuoteId) -> Result<bool>;
}
