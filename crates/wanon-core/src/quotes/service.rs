use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    cache::CacheStore,
    domain::{ChatId, MessageId},
    payload::{Creator, MessagePayload},
    quotes::{NewQuote, Quote, QuoteStore, Thread, ThreadBuilder},
    Result,
};

/// A request to save the thread ending at `target_message_id`.
#[derive(Clone, Debug)]
pub struct SaveQuoteRequest {
    pub chat_id: ChatId,
    pub creator: Creator,
    pub target_message_id: MessageId,
    /// The replied-to message as delivered with the command, if the caller has it.
    pub target_literal: Option<MessagePayload>,
}

/// Save/sample flows over the cache and quote stores.
#[derive(Clone)]
pub struct QuoteService {
    builder: ThreadBuilder,
    quotes: Arc<dyn QuoteStore>,
}

impl QuoteService {
    pub fn new(cache: Arc<dyn CacheStore>, quotes: Arc<dyn QuoteStore>) -> Self {
        Self {
            builder: ThreadBuilder::new(cache),
            quotes,
        }
    }

    /// Build the thread from the cache and persist it as a new quote.
    ///
    /// A cache miss falls back to the literal message when one was supplied.
    pub async fn save_quote(&self, req: SaveQuoteRequest) -> Result<Quote> {
        let thread = match self
            .builder
            .build_from(req.chat_id, req.target_message_id)
            .await
        {
            Ok(thread) => thread,
            Err(e) if e.is_not_found() => {
                let Some(literal) = req.target_literal else {
                    return Err(e);
                };
                debug!(
                    chat_id = req.chat_id.0,
                    message_id = req.target_message_id.0,
                    "message not cached, quoting the literal reply"
                );
                Thread::from_literal(req.chat_id, req.target_message_id, literal)
            }
            Err(e) => return Err(e),
        };

        let quote = self
            .quotes
            .insert(NewQuote::from_thread(req.creator, thread))
            .await?;
        info!(
            chat_id = quote.chat_id.0,
            quote_id = quote.id.0,
            entries = quote.entries.len(),
            "quote saved"
        );
        Ok(quote)
    }

    /// A random quote of the chat; counts first so an empty chat never samples.
    pub async fn random_quote(&self, chat_id: ChatId) -> Result<Option<Quote>> {
        if self.quotes.count_for_chat(chat_id).await? == 0 {
            return Ok(None);
        }
        self.quotes.random_for_chat(chat_id).await
    }
}
