use rusqlite::Connection;
use tracing::debug;

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cache_entries (
            id          INTEGER PRIMARY KEY,
            chat_id     INTEGER NOT NULL,
            message_id  INTEGER NOT NULL,
            reply_id    INTEGER,
            date        INTEGER NOT NULL,
            message     TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL,
            UNIQUE(chat_id, message_id)
        );

        CREATE INDEX IF NOT EXISTS idx_cache_entries_date
            ON cache_entries(date);

        CREATE INDEX IF NOT EXISTS idx_cache_entries_reply
            ON cache_entries(chat_id, reply_id);

        CREATE TABLE IF NOT EXISTS quotes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            creator     TEXT NOT NULL,
            chat_id     INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_quotes_chat
            ON quotes(chat_id);

        CREATE TABLE IF NOT EXISTS quote_entries (
            id          INTEGER PRIMARY KEY,
            quote_id    INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
            entry_order INTEGER NOT NULL,
            message     TEXT NOT NULL,
            UNIQUE(quote_id, entry_order)
        );
        ",
    )?;

    debug!("database migrations complete");
    Ok(())
}
