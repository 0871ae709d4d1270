use std::{collections::HashSet, sync::Arc};

use tracing::{debug, warn};

use crate::{
    cache::{CacheEntry, CacheStore},
    domain::{ChatId, MessageId},
    errors::Error,
    payload::MessagePayload,
    Result,
};

/// An ordered reply chain, oldest message first.
#[derive(Clone, Debug, PartialEq)]
pub struct Thread {
    pub chat_id: ChatId,
    pub entries: Vec<CacheEntry>,
}

impl Thread {
    /// Single-message thread built from a message the caller already holds.
    ///
    /// Only the message itself is captured; its own reply reference is not followed.
    pub fn from_literal(chat_id: ChatId, message_id: MessageId, message: MessagePayload) -> Self {
        let entry = CacheEntry {
            chat_id,
            message_id,
            reply_id: message.reply_to_message_id(),
            date: message.date().unwrap_or_default(),
            message,
        };
        Self {
            chat_id,
            entries: vec![entry],
        }
    }
}

/// Reconstructs reply chains from the message cache.
#[derive(Clone)]
pub struct ThreadBuilder {
    cache: Arc<dyn CacheStore>,
}

impl ThreadBuilder {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Walk reply links backwards from `message_id` until the chain leaves the cache.
    ///
    /// A missing predecessor truncates the thread; only an empty result is `NotFound`.
    pub async fn build_from(&self, chat_id: ChatId, message_id: MessageId) -> Result<Thread> {
        let mut newest_first: Vec<CacheEntry> = Vec::new();
        let mut visited: HashSet<MessageId> = HashSet::new();
        let mut current = message_id;

        loop {
            if !visited.insert(current) {
                warn!(
                    chat_id = chat_id.0,
                    message_id = current.0,
                    "reply chain loops back on itself, stopping"
                );
                break;
            }

            let Some(entry) = self.cache.get(chat_id, current).await? else {
                break;
            };

            let next = entry.reply_id.filter(|id| id.0 != 0);
            newest_first.push(entry);

            match next {
                Some(id) => current = id,
                None => break,
            }
        }

        if newest_first.is_empty() {
            return Err(Error::NotFound(format!(
                "no cache entries found for message {message_id} in chat {chat_id}"
            )));
        }

        newest_first.reverse();
        debug!(
            chat_id = chat_id.0,
            message_id = message_id.0,
            entries = newest_first.len(),
            "built quote thread"
        );

        Ok(Thread {
            chat_id,
            entries: newest_first,
        })
    }
}
