//! Plain-text rendering of saved quotes.

use chrono::DateTime;

use crate::{errors::Error, quotes::Quote, Result};

const NO_TEXT: &str = "(no text)";

/// Format a quote as `"<Author>: <Text>"` lines, optionally prefixed with `#<id>`.
pub fn render(quote: &Quote, include_id: bool) -> Result<String> {
    if quote.entries.is_empty() {
        return Err(Error::InvalidInput(format!(
            "cannot render quote #{} with no entries",
            quote.id
        )));
    }

    let body = quote
        .entries
        .iter()
        .map(|entry| {
            let text = entry.message.text().unwrap_or(NO_TEXT);
            format!("{}: {}", entry.message.author_name(), text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    if include_id {
        return Ok(format!("#{}\n{}", quote.id, body));
    }
    Ok(body)
}

/// Like [`render`] with the id, plus a trailing date line taken from the first message.
pub fn render_with_date(quote: &Quote) -> Result<String> {
    let mut text = render(quote, true)?;

    let sent = quote
        .entries
        .first()
        .and_then(|e| e.message.date())
        .filter(|d| *d > 0)
        .and_then(|d| DateTime::from_timestamp(d, 0));
    if let Some(sent) = sent {
        text.push_str(&format!("\n📅 {}", sent.format("%Y-%m-%d %H:%M")));
    }

    Ok(text)
}
