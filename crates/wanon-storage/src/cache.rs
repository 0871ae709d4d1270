use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use wanon_core::{
    cache::{CacheEntry, CacheStore},
    domain::{ChatId, MessageId},
    payload::MessagePayload,
    Result,
};

use crate::{
    db::{call_blocking, payload_column, Database, StoreResultExt},
    SqliteStore,
};

impl Database {
    pub fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<()> {
        let now = Utc::now().timestamp();
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO cache_entries (chat_id, message_id, reply_id, date, message, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(chat_id, message_id) DO UPDATE SET
                reply_id = excluded.reply_id,
                date = excluded.date,
                message = excluded.message,
                updated_at = excluded.updated_at",
            params![
                entry.chat_id.0,
                entry.message_id.0,
                entry.reply_id.map(|r| r.0),
                entry.date,
                entry.message.to_json(),
                now,
            ],
        )
        .store()?;
        Ok(())
    }

    pub fn get_cache_entry(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Option<CacheEntry>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT reply_id, date, message FROM cache_entries
             WHERE chat_id = ?1 AND message_id = ?2",
            params![chat_id.0, message_id.0],
            |row| {
                Ok(CacheEntry {
                    chat_id,
                    message_id,
                    reply_id: row
                        .get::<_, Option<i32>>(0)?
                        .filter(|r| *r != 0)
                        .map(MessageId),
                    date: row.get(1)?,
                    message: payload_column(row, 2)?,
                })
            },
        )
        .optional()
        .store()
    }

    pub fn replace_cache_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &MessagePayload,
    ) -> Result<bool> {
        let conn = self.lock_conn()?;
        let rows = conn
            .execute(
                "UPDATE cache_entries SET message = ?3, updated_at = ?4
                 WHERE chat_id = ?1 AND message_id = ?2",
                params![
                    chat_id.0,
                    message_id.0,
                    message.to_json(),
                    Utc::now().timestamp()
                ],
            )
            .store()?;
        Ok(rows > 0)
    }

    pub fn delete_cache_entries_up_to(&self, cutoff: i64) -> Result<u64> {
        let conn = self.lock_conn()?;
        let rows = conn
            .execute("DELETE FROM cache_entries WHERE date <= ?1", params![cutoff])
            .store()?;
        debug!(cutoff, rows, "cache entries deleted");
        Ok(rows as u64)
    }

    pub fn count_cache_entries(&self) -> Result<u64> {
        self.with_conn(|c| {
            c.query_row("SELECT COUNT(*) FROM cache_entries", [], |r| {
                r.get::<_, i64>(0)
            })
        })
        .map(|n| n as u64)
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn upsert(&self, entry: CacheEntry) -> Result<()> {
        call_blocking(self.database().clone(), move |db| {
            db.upsert_cache_entry(&entry)
        })
        .await
    }

    async fn get(&self, chat_id: ChatId, message_id: MessageId) -> Result<Option<CacheEntry>> {
        call_blocking(self.database().clone(), move |db| {
            db.get_cache_entry(chat_id, message_id)
        })
        .await
    }

    async fn replace_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: MessagePayload,
    ) -> Result<bool> {
        call_blocking(self.database().clone(), move |db| {
            db.replace_cache_message(chat_id, message_id, &message)
        })
        .await
    }

    async fn delete_dated_up_to(&self, cutoff: i64) -> Result<u64> {
        call_blocking(self.database().clone(), move |db| {
            db.delete_cache_entries_up_to(cutoff)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        call_blocking(self.database().clone(), |db| db.count_cache_entries()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wanon_core::{
        cache::{CacheEvictor, CacheService, EditedMessage, EvictorConfig, ReceivedMessage},
        quotes::ThreadBuilder,
    };

    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn payload(chat_id: i64, message_id: i32, reply_to: Option<i32>, date: i64, text: &str) -> MessagePayload {
        let mut v = json!({
            "message_id": message_id,
            "chat": {"id": chat_id, "type": "group"},
            "date": date,
            "text": text,
            "from": {"id": 7, "first_name": "Ann"}
        });
        if let Some(r) = reply_to {
            v["reply_to_message"] = json!({ "message_id": r });
        }
        MessagePayload::from_value(v).unwrap()
    }

    fn entry(chat_id: i64, message_id: i32, reply_to: Option<i32>, date: i64, text: &str) -> CacheEntry {
        ReceivedMessage::from_payload(payload(chat_id, message_id, reply_to, date, text))
            .unwrap()
            .into_entry()
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let s = store();
        s.upsert(entry(-100, 2, Some(1), 1_000, "hi")).await.unwrap();

        let got = s.get(ChatId(-100), MessageId(2)).await.unwrap().unwrap();
        assert_eq!(got.reply_id, Some(MessageId(1)));
        assert_eq!(got.date, 1_000);
        assert_eq!(got.message.text(), Some("hi"));
        assert!(s.get(ChatId(-100), MessageId(3)).await.unwrap().is_none());
        assert!(s.get(ChatId(-101), MessageId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_link_date_and_content() {
        let s = store();
        s.upsert(entry(1, 2, Some(1), 1_000, "first")).await.unwrap();
        s.upsert(entry(1, 2, None, 2_000, "second")).await.unwrap();

        let got = s.get(ChatId(1), MessageId(2)).await.unwrap().unwrap();
        assert_eq!(got.reply_id, None);
        assert_eq!(got.date, 2_000);
        assert_eq!(got.message.text(), Some("second"));
        assert_eq!(s.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_of_one_key_leave_one_row() {
        let s = store();
        let mut handles = Vec::new();
        for i in 0..16 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                s.upsert(entry(5, 9, None, 1_000 + i, &format!("v{i}")))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(s.count().await.unwrap(), 1);
        let got = s.get(ChatId(5), MessageId(9)).await.unwrap().unwrap();
        let text = got.message.text().unwrap().to_string();
        assert_eq!(text, format!("v{}", got.date - 1_000));
    }

    #[tokio::test]
    async fn replace_message_reports_misses() {
        let s = store();
        let p = payload(1, 1, None, 1, "x");
        assert!(!s.replace_message(ChatId(1), MessageId(1), p.clone()).await.unwrap());
        s.upsert(entry(1, 1, None, 1, "old")).await.unwrap();
        assert!(s.replace_message(ChatId(1), MessageId(1), p).await.unwrap());
    }

    #[tokio::test]
    async fn edit_through_service_keeps_reply_link() {
        let s = Arc::new(store());
        let svc = CacheService::new(s.clone());
        svc.ingest(ReceivedMessage::from_payload(payload(1, 2, Some(1), 1_000, "typo")).unwrap())
            .await
            .unwrap();

        let edit = MessagePayload::from_value(json!({
            "message_id": 2,
            "chat": {"id": 1, "type": "group"},
            "date": 1_000,
            "edit_date": 1_050,
            "text": "fixed"
        }))
        .unwrap();
        svc.edit(EditedMessage::from_payload(edit).unwrap())
            .await
            .unwrap();

        let got = s.get(ChatId(1), MessageId(2)).await.unwrap().unwrap();
        assert_eq!(got.message.text(), Some("fixed"));
        assert_eq!(got.message.edit_date(), Some(1_050));
        assert_eq!(got.reply_id, Some(MessageId(1)));
        assert_eq!(got.message.reply_to_message_id(), Some(MessageId(1)));
    }

    #[tokio::test]
    async fn eviction_boundary_is_inclusive() {
        let s = Arc::new(store());
        let now = 1_700_000_000;
        let keep = 48 * 60 * 60;
        s.upsert(entry(1, 1, None, now - keep, "at cutoff")).await.unwrap();
        s.upsert(entry(1, 2, None, now - keep + 1, "younger")).await.unwrap();
        s.upsert(entry(1, 3, None, now - keep - 1, "older")).await.unwrap();

        let evictor = CacheEvictor::new(
            s.clone(),
            EvictorConfig {
                keep_duration: std::time::Duration::from_secs(keep as u64),
                ..EvictorConfig::default()
            },
        );
        evictor.sweep_at(now).await.unwrap();

        assert_eq!(s.count().await.unwrap(), 1);
        assert!(s.get(ChatId(1), MessageId(2)).await.unwrap().is_some());
        // Nothing left to delete is still a success.
        evictor.sweep_at(now).await.unwrap();
    }

    #[tokio::test]
    async fn builder_walks_sqlite_cache() {
        let s = Arc::new(store());
        s.upsert(entry(1, 10, None, 1, "a")).await.unwrap();
        s.upsert(entry(1, 11, Some(10), 2, "b")).await.unwrap();
        s.upsert(entry(1, 12, Some(11), 3, "c")).await.unwrap();
        s.upsert(entry(2, 11, None, 2, "other chat")).await.unwrap();

        let thread = ThreadBuilder::new(s.clone())
            .build_from(ChatId(1), MessageId(12))
            .await
            .unwrap();
        let ids: Vec<i32> = thread.entries.iter().map(|e| e.message_id.0).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }
}
