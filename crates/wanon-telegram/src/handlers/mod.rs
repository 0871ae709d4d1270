//! Telegram update handlers.
//!
//! Every update passes the chat allowlist first, then reaches the cache, and
//! finally the command handler when it carries a command.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::{debug, error, info, warn};

use wanon_core::{
    cache::{EditedMessage, ReceivedMessage},
    domain::ChatId,
    messaging::MessagingPort,
    security::ChatFilter,
};

use crate::{convert, router::AppState};

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    if !admit(&state.filter, state.messenger.as_ref(), chat_id).await {
        return Ok(());
    }

    match ReceivedMessage::from_payload(convert::message_payload(&msg)) {
        Ok(received) => {
            if let Err(e) = state.cache.ingest(received).await {
                error!(chat_id = chat_id.0, message_id = msg.id.0, error = %e, "failed to cache message");
            }
        }
        Err(e) => warn!(chat_id = chat_id.0, error = %e, "skipping message without identity"),
    }

    if let Some(cmd) = convert::command(&msg) {
        let name = cmd.name.clone();
        if let Err(e) = state.commands.handle(cmd).await {
            error!(chat_id = chat_id.0, command = %name, error = %e, "command handler error");
        }
    }

    Ok(())
}

pub async fn handle_edited_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    if !admit(&state.filter, state.messenger.as_ref(), chat_id).await {
        return Ok(());
    }

    let result = match EditedMessage::from_payload(convert::message_payload(&msg)) {
        Ok(edit) => state.cache.edit(edit).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!(chat_id = chat_id.0, message_id = msg.id.0, error = %e, "failed to apply edit");
    }

    Ok(())
}

/// Whether updates from `chat_id` may proceed. Leaves the chat when the filter says so.
pub async fn admit(filter: &ChatFilter, messenger: &dyn MessagingPort, chat_id: ChatId) -> bool {
    if filter.is_allowed(chat_id) {
        return true;
    }

    info!(chat_id = chat_id.0, "ignoring update from unauthorized chat");
    if filter.auto_leave() {
        info!(chat_id = chat_id.0, "leaving unauthorized chat");
        match messenger.leave_chat(chat_id).await {
            Ok(()) => debug!(chat_id = chat_id.0, "left chat"),
            Err(e) => error!(chat_id = chat_id.0, error = %e, "failed to leave chat"),
        }
    }
    false
}
