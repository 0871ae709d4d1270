//! teloxide types → core payloads.

use serde_json::{json, Map, Value};
use teloxide::types::{Chat, Message, User};

use wanon_core::{
    domain::{ChatId, MessageId},
    messaging::{parse_command, Command, ReplyTarget},
    payload::{Creator, MessagePayload},
};

/// Snapshot the fields of a Telegram message the bot keeps.
pub fn message_payload(msg: &Message) -> MessagePayload {
    let mut map = Map::new();
    map.insert("message_id".into(), json!(msg.id.0));
    map.insert("chat".into(), chat_value(&msg.chat));
    map.insert("date".into(), json!(msg.date.timestamp()));

    if let Some(text) = msg.text() {
        map.insert("text".into(), json!(text));
    }
    if let Some(caption) = msg.caption() {
        map.insert("caption".into(), json!(caption));
    }
    if let Some(user) = msg.from() {
        map.insert("from".into(), user_value(user));
    }
    if let Some(reply) = msg.reply_to_message() {
        map.insert(
            "reply_to_message".into(),
            json!({ "message_id": reply.id.0 }),
        );
    }
    if let Some(edited) = msg.edit_date() {
        map.insert("edit_date".into(), json!(edited.timestamp()));
    }

    MessagePayload::from_map(map)
}

pub fn creator(user: Option<&User>) -> Creator {
    match user {
        Some(u) => Creator::new(
            u.id.0 as i64,
            &u.first_name,
            u.last_name.as_deref(),
            u.username.as_deref(),
        ),
        None => Creator::unknown(),
    }
}

/// The bot command carried by `msg`, if its text starts with `/`.
pub fn command(msg: &Message) -> Option<Command> {
    let name = parse_command(msg.text()?)?;
    let reply_to = msg.reply_to_message().map(|reply| ReplyTarget {
        message_id: MessageId(reply.id.0),
        message: message_payload(reply),
    });

    Some(Command {
        chat_id: ChatId(msg.chat.id.0),
        creator: creator(msg.from()),
        name,
        reply_to,
    })
}

fn chat_value(chat: &Chat) -> Value {
    let kind = if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else {
        "channel"
    };

    let mut v = json!({ "id": chat.id.0, "type": kind });
    if let Some(title) = chat.title() {
        v["title"] = json!(title);
    }
    v
}

fn user_value(user: &User) -> Value {
    let mut v = json!({
        "id": user.id.0,
        "is_bot": user.is_bot,
        "first_name": user.first_name,
    });
    if let Some(last) = &user.last_name {
        v["last_name"] = json!(last);
    }
    if let Some(username) = &user.username {
        v["username"] = json!(username);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use wanon_core::cache::{EditedMessage, ReceivedMessage};

    fn tg_message(v: Value) -> Message {
        serde_json::from_value(v).unwrap()
    }

    fn group_text(message_id: i32, text: &str) -> Value {
        json!({
            "message_id": message_id,
            "date": 1_700_000_000,
            "chat": {"id": -1001, "type": "supergroup", "title": "Friends"},
            "from": {"id": 42, "is_bot": false, "first_name": "Ada", "last_name": "L", "username": "ada"},
            "text": text
        })
    }

    #[test]
    fn payload_keeps_identity_sender_and_reply() {
        let mut v = group_text(11, "second");
        v["reply_to_message"] = group_text(10, "first");
        let msg = tg_message(v);

        let received = ReceivedMessage::from_payload(message_payload(&msg)).unwrap();
        assert_eq!(received.chat_id, ChatId(-1001));
        assert_eq!(received.message_id, MessageId(11));
        assert_eq!(received.reply_to, Some(MessageId(10)));
        assert_eq!(received.date, 1_700_000_000);
        assert_eq!(received.content.text(), Some("second"));
        assert_eq!(received.content.author_name(), "Ada L");
    }

    #[test]
    fn edited_payload_carries_edit_date() {
        let mut v = group_text(11, "fixed");
        v["edit_date"] = json!(1_700_000_100);
        let msg = tg_message(v);

        let edit = EditedMessage::from_payload(message_payload(&msg)).unwrap();
        assert_eq!(edit.edit_date, 1_700_000_100);
        assert_eq!(edit.content.text(), Some("fixed"));
    }

    #[test]
    fn command_captures_reply_target_and_creator() {
        let mut v = group_text(12, "/addquote@wanon_bot");
        v["reply_to_message"] = group_text(11, "quote me");
        let msg = tg_message(v);

        let cmd = command(&msg).unwrap();
        assert_eq!(cmd.name, "addquote");
        assert_eq!(cmd.chat_id, ChatId(-1001));
        assert_eq!(cmd.creator.sender().username.as_deref(), Some("ada"));

        let target = cmd.reply_to.unwrap();
        assert_eq!(target.message_id, MessageId(11));
        assert_eq!(target.message.text(), Some("quote me"));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(command(&tg_message(group_text(1, "hello"))).is_none());
    }

    #[test]
    fn missing_user_is_unknown_creator() {
        assert_eq!(creator(None).sender().display_name(), "Unknown");
    }
}
