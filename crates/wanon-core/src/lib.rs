//! Core domain + application logic for the wanon quote bot.
//!
//! This crate is framework-agnostic. Telegram and SQLite live behind ports
//! (traits) implemented in adapter crates.

pub mod cache;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod payload;
pub mod quotes;
pub mod security;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
