use std::sync::Arc;

use tracing::debug;

use crate::{
    cache::{CacheStore, EditedMessage, ReceivedMessage},
    payload::MessagePayload,
    Result,
};

/// Ingest and edit operations against the cache store.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Upsert the message; re-delivery of the same message overwrites the row.
    pub async fn ingest(&self, msg: ReceivedMessage) -> Result<()> {
        debug!(
            chat_id = msg.chat_id.0,
            message_id = msg.message_id.0,
            date = msg.date,
            "adding message to cache"
        );
        self.store.upsert(msg.into_entry()).await
    }

    pub async fn ingest_json(&self, raw: &str) -> Result<()> {
        let payload = MessagePayload::from_json(raw)?;
        self.ingest(ReceivedMessage::from_payload(payload)?).await
    }

    /// Patch the cached payload with the edited fields.
    ///
    /// Edits of messages that were never cached (or already evicted) are ignored.
    pub async fn edit(&self, edit: EditedMessage) -> Result<()> {
        debug!(
            chat_id = edit.chat_id.0,
            message_id = edit.message_id.0,
            edit_date = edit.edit_date,
            "processing edited message"
        );

        let Some(entry) = self.store.get(edit.chat_id, edit.message_id).await? else {
            debug!(
                chat_id = edit.chat_id.0,
                message_id = edit.message_id.0,
                "edited message not in cache, skipping"
            );
            return Ok(());
        };

        let mut message = entry.message;
        message.merge_edit(&edit.content);

        let updated = self
            .store
            .replace_message(edit.chat_id, edit.message_id, message)
            .await?;
        if !updated {
            // Evicted between the read and the write.
            debug!(
                chat_id = edit.chat_id.0,
                message_id = edit.message_id.0,
                "edited message vanished from cache"
            );
        }
        Ok(())
    }

    pub async fn edit_json(&self, raw: &str) -> Result<()> {
        let payload = MessagePayload::from_json(raw)?;
        self.edit(EditedMessage::from_payload(payload)?).await
    }
}
