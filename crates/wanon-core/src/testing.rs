//! In-memory fakes of the ports for unit tests.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicI32, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::{
    cache::{CacheEntry, CacheStore, ReceivedMessage},
    domain::{ChatId, MessageId, MessageRef, QuoteId},
    payload::MessagePayload,
    quotes::{NewQuote, Quote, QuoteEntry, QuoteStore},
    messaging::MessagingPort,
    Result,
};

/// A received message from `User<message_id>` in `chat_id`.
pub fn message(
    chat_id: i64,
    message_id: i32,
    reply_to: Option<i32>,
    date: i64,
    text: &str,
) -> ReceivedMessage {
    let mut v = json!({
        "message_id": message_id,
        "chat": {"id": chat_id, "type": "group"},
        "date": date,
        "text": text,
        "from": {"id": message_id, "first_name": format!("User{message_id}")}
    });
    if let Some(r) = reply_to {
        v["reply_to_message"] = json!({ "message_id": r });
    }
    ReceivedMessage::from_payload(MessagePayload::from_value(v).unwrap()).unwrap()
}

pub fn entry(
    chat_id: i64,
    message_id: i32,
    reply_to: Option<i32>,
    date: i64,
    text: &str,
) -> CacheEntry {
    message(chat_id, message_id, reply_to, date, text).into_entry()
}

/// Implements both stores over maps.
#[derive(Default)]
pub struct MemoryStore {
    cache: Mutex<BTreeMap<(ChatId, MessageId), CacheEntry>>,
    quotes: Mutex<BTreeMap<QuoteId, Quote>>,
    next_quote: AtomicI32,
    picks: AtomicUsize,
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn upsert(&self, entry: CacheEntry) -> Result<()> {
        self.cache
            .lock()
            .unwrap()
            .insert((entry.chat_id, entry.message_id), entry);
        Ok(())
    }

    async fn get(&self, chat_id: ChatId, message_id: MessageId) -> Result<Option<CacheEntry>> {
        Ok(self
            .cache
            .lock()
            .unwrap()
            .get(&(chat_id, message_id))
            .cloned())
    }

    async fn replace_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: MessagePayload,
    ) -> Result<bool> {
        let mut cache = self.cache.lock().unwrap();
        let Some(entry) = cache.get_mut(&(chat_id, message_id)) else {
            return Ok(false);
        };
        entry.message = message;
        Ok(true)
    }

    async fn delete_dated_up_to(&self, cutoff: i64) -> Result<u64> {
        let mut cache = self.cache.lock().unwrap();
        let before = cache.len();
        cache.retain(|_, e| e.date > cutoff);
        Ok((before - cache.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.cache.lock().unwrap().len() as u64)
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn insert(&self, quote: NewQuote) -> Result<Quote> {
        quote.validate()?;
        let id = QuoteId(i64::from(self.next_quote.fetch_add(1, Ordering::SeqCst) + 1));
        let stored = Quote {
            id,
            creator: quote.creator,
            chat_id: quote.chat_id,
            created_at: Utc::now(),
            entries: quote
                .messages
                .into_iter()
                .enumerate()
                .map(|(i, message)| QuoteEntry {
                    order: i as u32,
                    message,
                })
                .collect(),
        };
        self.quotes.lock().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: QuoteId) -> Result<Option<Quote>> {
        Ok(self.quotes.lock().unwrap().get(&id).cloned())
    }

    async fn random_for_chat(&self, chat_id: ChatId) -> Result<Option<Quote>> {
        let quotes = self.quotes.lock().unwrap();
        let in_chat: Vec<&Quote> = quotes.values().filter(|q| q.chat_id == chat_id).collect();
        if in_chat.is_empty() {
            return Ok(None);
        }
        // Round-robin is enough for tests.
        let pick = self.picks.fetch_add(1, Ordering::SeqCst) % in_chat.len();
        Ok(Some(in_chat[pick].clone()))
    }

    async fn count_for_chat(&self, chat_id: ChatId) -> Result<u64> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.chat_id == chat_id)
            .count() as u64)
    }

    async fn delete(&self, id: QuoteId) -> Result<bool> {
        Ok(self.quotes.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: AtomicI32,
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl FakeMessenger {
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }

    async fn leave_chat(&self, _chat_id: ChatId) -> Result<()> {
        Ok(())
    }
}
