//! SQLite adapter for the cache and quote stores.

pub mod cache;
pub mod db;
pub mod migrations;
pub mod quotes;

use std::sync::Arc;

pub use db::{call_blocking, Database};

/// Implements `CacheStore` and `QuoteStore` over one shared [`Database`].
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}
