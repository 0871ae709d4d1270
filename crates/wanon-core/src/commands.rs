//! `/addquote` and `/rquote`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    messaging::{Command, MessagingPort},
    quotes::{render, render_with_date, QuoteService, SaveQuoteRequest},
    Result,
};

pub const NOT_A_REPLY: &str = "Please reply to a message to add it as a quote.";
pub const CANNOT_BUILD: &str = "Could not build quote. The message may be too old or not in cache.";
pub const NO_QUOTES: &str = "No quotes found in this chat. Add some with /addquote!";
pub const HELP: &str = "/addquote - reply to a message to save it (and the thread above it) as a quote\n\
/rquote - show a random quote from this chat";

/// Turns parsed commands into replies sent through the messaging port.
#[derive(Clone)]
pub struct CommandHandler {
    quotes: QuoteService,
    messenger: Arc<dyn MessagingPort>,
}

impl CommandHandler {
    pub fn new(quotes: QuoteService, messenger: Arc<dyn MessagingPort>) -> Self {
        Self { quotes, messenger }
    }

    pub async fn handle(&self, cmd: Command) -> Result<()> {
        let chat_id = cmd.chat_id;
        let Some(reply) = self.reply_for(cmd).await? else {
            return Ok(());
        };
        self.messenger.send_text(chat_id, &reply).await?;
        Ok(())
    }

    /// The text to answer `cmd` with, `None` for commands this bot does not know.
    pub async fn reply_for(&self, cmd: Command) -> Result<Option<String>> {
        match cmd.name.as_str() {
            "addquote" => self.add_quote(cmd).await.map(Some),
            "rquote" => self.random_quote(cmd).await.map(Some),
            "start" | "help" => Ok(Some(HELP.to_string())),
            other => {
                debug!(command = other, "ignoring unknown command");
                Ok(None)
            }
        }
    }

    async fn add_quote(&self, cmd: Command) -> Result<String> {
        info!(
            chat_id = cmd.chat_id.0,
            user_id = cmd.creator.sender().id.unwrap_or_default(),
            "executing /addquote command"
        );

        let Some(target) = cmd.reply_to else {
            return Ok(NOT_A_REPLY.to_string());
        };

        let req = SaveQuoteRequest {
            chat_id: cmd.chat_id,
            creator: cmd.creator,
            target_message_id: target.message_id,
            target_literal: Some(target.message),
        };
        let quote = match self.quotes.save_quote(req).await {
            Ok(q) => q,
            Err(e) if e.is_not_found() => return Ok(CANNOT_BUILD.to_string()),
            Err(e) => return Err(e),
        };

        render(&quote, true)
    }

    async fn random_quote(&self, cmd: Command) -> Result<String> {
        info!(chat_id = cmd.chat_id.0, "executing /rquote command");

        match self.quotes.random_quote(cmd.chat_id).await? {
            Some(quote) => render_with_date(&quote),
            None => Ok(NO_QUOTES.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::CacheStore,
        domain::{ChatId, MessageId},
        messaging::ReplyTarget,
        payload::Creator,
        testing::{entry, message, FakeMessenger, MemoryStore},
    };

    fn handler(store: &Arc<MemoryStore>, messenger: &Arc<FakeMessenger>) -> CommandHandler {
        CommandHandler::new(
            QuoteService::new(store.clone(), store.clone()),
            messenger.clone(),
        )
    }

    fn command(name: &str, reply_to: Option<ReplyTarget>) -> Command {
        Command {
            chat_id: ChatId(1),
            creator: Creator::new(5, "Eve", None, None),
            name: name.to_string(),
            reply_to,
        }
    }

    fn reply_to(message_id: i32, text: &str) -> ReplyTarget {
        ReplyTarget {
            message_id: MessageId(message_id),
            message: message(1, message_id, None, 1_700_000_000, text).content,
        }
    }

    #[tokio::test]
    async fn addquote_requires_a_reply() {
        let store = Arc::new(MemoryStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        handler(&store, &messenger)
            .handle(command("addquote", None))
            .await
            .unwrap();
        assert_eq!(messenger.sent(), vec![(ChatId(1), NOT_A_REPLY.to_string())]);
    }

    #[tokio::test]
    async fn addquote_confirms_with_rendered_thread() {
        let store = Arc::new(MemoryStore::default());
        store.upsert(entry(1, 1, None, 100, "ping")).await.unwrap();
        store.upsert(entry(1, 2, Some(1), 101, "pong")).await.unwrap();
        let messenger = Arc::new(FakeMessenger::default());

        handler(&store, &messenger)
            .handle(command("addquote", Some(reply_to(2, "pong"))))
            .await
            .unwrap();

        assert_eq!(
            messenger.sent(),
            vec![(ChatId(1), "#1\nUser1: ping\nUser2: pong".to_string())]
        );
    }

    #[tokio::test]
    async fn rquote_without_quotes_says_so() {
        let store = Arc::new(MemoryStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        handler(&store, &messenger)
            .handle(command("rquote", None))
            .await
            .unwrap();
        assert_eq!(messenger.sent(), vec![(ChatId(1), NO_QUOTES.to_string())]);
    }

    #[tokio::test]
    async fn rquote_renders_with_date() {
        let store = Arc::new(MemoryStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        let h = handler(&store, &messenger);
        h.handle(command("addquote", Some(reply_to(3, "uncached"))))
            .await
            .unwrap();

        let reply = h.reply_for(command("rquote", None)).await.unwrap();
        assert_eq!(
            reply.as_deref(),
            Some("#1\nUser3: uncached\n📅 2023-11-14 22:13")
        );
    }

    #[tokio::test]
    async fn unknown_commands_are_silent() {
        let store = Arc::new(MemoryStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        handler(&store, &messenger)
            .handle(command("frobnicate", None))
            .await
            .unwrap();
        assert!(messenger.sent().is_empty());
    }
}
