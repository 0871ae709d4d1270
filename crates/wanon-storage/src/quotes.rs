use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use wanon_core::{
    domain::{ChatId, QuoteId},
    payload::Creator,
    quotes::{NewQuote, Quote, QuoteEntry, QuoteStore},
    Result,
};

use crate::{
    db::{call_blocking, payload_column, Database, StoreResultExt},
    SqliteStore,
};

/// Quote row without its entries.
struct QuoteHeader {
    id: QuoteId,
    creator: Creator,
    chat_id: ChatId,
    created_at: DateTime<Utc>,
}

fn read_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuoteHeader> {
    let creator_raw: String = row.get(1)?;
    let creator = Creator::from_json(&creator_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let created_secs: i64 = row.get(3)?;
    let created_at = DateTime::from_timestamp(created_secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Integer,
            format!("timestamp {created_secs} out of range").into(),
        )
    })?;
    Ok(QuoteHeader {
        id: QuoteId(row.get(0)?),
        creator,
        chat_id: ChatId(row.get(2)?),
        created_at,
    })
}

fn load_entries(conn: &Connection, header: QuoteHeader) -> rusqlite::Result<Quote> {
    let mut stmt = conn.prepare(
        "SELECT entry_order, message FROM quote_entries
         WHERE quote_id = ?1 ORDER BY entry_order ASC",
    )?;
    let entries = stmt
        .query_map(params![header.id.0], |row| {
            Ok(QuoteEntry {
                order: row.get(0)?,
                message: payload_column(row, 1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Quote {
        id: header.id,
        creator: header.creator,
        chat_id: header.chat_id,
        created_at: header.created_at,
        entries,
    })
}

fn quote_where(conn: &Connection, sql: &str, param: i64) -> rusqlite::Result<Option<Quote>> {
    let header = conn.query_row(sql, params![param], read_header).optional()?;
    header.map(|h| load_entries(conn, h)).transpose()
}

impl Database {
    /// Write the quote and all entries in one transaction.
    pub fn insert_quote(&self, quote: &NewQuote) -> Result<Quote> {
        quote.validate()?;

        let created_at = Utc::now();
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction().store()?;
        tx.execute(
            "INSERT INTO quotes (creator, chat_id, created_at) VALUES (?1, ?2, ?3)",
            params![quote.creator.to_json(), quote.chat_id.0, created_at.timestamp()],
        )
        .store()?;
        let id = QuoteId(tx.last_insert_rowid());

        let mut entries = Vec::with_capacity(quote.messages.len());
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO quote_entries (quote_id, entry_order, message)
                     VALUES (?1, ?2, ?3)",
                )
                .store()?;
            for (order, message) in quote.messages.iter().enumerate() {
                let order = order as u32;
                stmt.execute(params![id.0, order, message.to_json()])
                    .store()?;
                entries.push(QuoteEntry {
                    order,
                    message: message.clone(),
                });
            }
        }
        tx.commit().store()?;

        Ok(Quote {
            id,
            creator: quote.creator.clone(),
            chat_id: quote.chat_id,
            // Stored with second precision.
            created_at: DateTime::from_timestamp(created_at.timestamp(), 0).unwrap_or(created_at),
            entries,
        })
    }

    pub fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>> {
        self.with_conn(|c| {
            quote_where(
                c,
                "SELECT id, creator, chat_id, created_at FROM quotes WHERE id = ?1",
                id.0,
            )
        })
    }

    pub fn random_quote_for_chat(&self, chat_id: ChatId) -> Result<Option<Quote>> {
        self.with_conn(|c| {
            quote_where(
                c,
                "SELECT id, creator, chat_id, created_at FROM quotes
                 WHERE chat_id = ?1 ORDER BY RANDOM() LIMIT 1",
                chat_id.0,
            )
        })
    }

    pub fn count_quotes_for_chat(&self, chat_id: ChatId) -> Result<u64> {
        self.with_conn(|c| {
            c.query_row(
                "SELECT COUNT(*) FROM quotes WHERE chat_id = ?1",
                params![chat_id.0],
                |r| r.get::<_, i64>(0),
            )
        })
        .map(|n| n as u64)
    }

    /// Entries go with the quote through `ON DELETE CASCADE`.
    pub fn delete_quote(&self, id: QuoteId) -> Result<bool> {
        let rows = self.with_conn(|c| c.execute("DELETE FROM quotes WHERE id = ?1", params![id.0]))?;
        Ok(rows > 0)
    }
}

#[async_trait]
impl QuoteStore for SqliteStore {
    async fn insert(&self, quote: NewQuote) -> Result<Quote> {
        call_blocking(self.database().clone(), move |db| db.insert_quote(&quote)).await
    }

    async fn get_by_id(&self, id: QuoteId) -> Result<Option<Quote>> {
        call_blocking(self.database().clone(), move |db| db.get_quote(id)).await
    }

    async fn random_for_chat(&self, chat_id: ChatId) -> Result<Option<Quote>> {
        call_blocking(self.database().clone(), move |db| {
            db.random_quote_for_chat(chat_id)
        })
        .await
    }

    async fn count_for_chat(&self, chat_id: ChatId) -> Result<u64> {
        call_blocking(self.database().clone(), move |db| {
            db.count_quotes_for_chat(chat_id)
        })
        .await
    }

    async fn delete(&self, id: QuoteId) -> Result<bool> {
        call_blocking(self.database().clone(), move |db| db.delete_quote(id)).await
    }
}
