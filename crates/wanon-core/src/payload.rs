//! Opaque message payloads with narrow typed views.
//!
//! Telegram messages carry many optional fields that the quote logic never looks at.
//! Payloads are therefore kept as a JSON object and stored verbatim; the handful of
//! fields the core needs (ids, date, text, sender names) are read on demand.

use serde_json::{Map, Value};

use crate::{
    domain::{ChatId, MessageId},
    errors::Error,
    Result,
};

/// Fields that identify a message and are never replaced by an edit.
const STRUCTURAL_FIELDS: &[&str] = &["message_id", "chat", "date", "reply_to_message"];

/// A snapshot of one chat message as a JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagePayload(Map<String, Value>);

impl MessagePayload {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::MalformedPayload(format!("invalid message JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.0.get("message_id").and_then(as_message_id)
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.0
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .filter(|id| *id != 0)
            .map(ChatId)
    }

    /// Original send time as a Unix timestamp.
    pub fn date(&self) -> Option<i64> {
        self.0.get("date").and_then(Value::as_i64)
    }

    pub fn edit_date(&self) -> Option<i64> {
        self.0.get("edit_date").and_then(Value::as_i64)
    }

    /// Message text, `None` when absent or empty.
    pub fn text(&self) -> Option<&str> {
        self.0
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn reply_to_message_id(&self) -> Option<MessageId> {
        self.0
            .get("reply_to_message")
            .and_then(|r| r.get("message_id"))
            .and_then(as_message_id)
    }

    pub fn sender(&self) -> Option<Sender> {
        self.0
            .get("from")
            .and_then(Value::as_object)
            .map(Sender::from_map)
    }

    /// Display name of the sender, `"Unknown"` when nothing usable is present.
    pub fn author_name(&self) -> String {
        self.sender().unwrap_or_default().display_name()
    }

    /// Apply an edit on top of this snapshot.
    ///
    /// Every non-structural top-level field in `edit` replaces the stored value;
    /// fields the edit does not carry keep their previous value.
    pub fn merge_edit(&mut self, edit: &MessagePayload) {
        for (key, value) in edit.0.iter() {
            if STRUCTURAL_FIELDS.contains(&key.as_str()) {
                continue;
            }
            self.0.insert(key.clone(), value.clone());
        }
    }
}

/// Sender fields of a message (`from`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sender {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Sender {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            id: map.get("id").and_then(Value::as_i64),
            first_name: non_empty_str(map, "first_name"),
            last_name: non_empty_str(map, "last_name"),
            username: non_empty_str(map, "username"),
        }
    }

    /// First name wins over username even when both are present.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (Some(first), None, _) => first.clone(),
            (None, Some(last), _) => last.clone(),
            (None, None, Some(username)) => format!("@{username}"),
            (None, None, None) => "Unknown".to_string(),
        }
    }
}

/// Snapshot of the user who saved a quote.
#[derive(Clone, Debug, PartialEq)]
pub struct Creator(Map<String, Value>);

impl Creator {
    pub fn new(
        id: i64,
        first_name: &str,
        last_name: Option<&str>,
        username: Option<&str>,
    ) -> Self {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(id));
        map.insert("first_name".to_string(), Value::from(first_name));
        if let Some(last) = last_name.filter(|s| !s.is_empty()) {
            map.insert("last_name".to_string(), Value::from(last));
        }
        if let Some(username) = username.filter(|s| !s.is_empty()) {
            map.insert("username".to_string(), Value::from(username));
        }
        Self(map)
    }

    pub fn unknown() -> Self {
        Self::new(0, "Unknown", None, None)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::MalformedPayload(format!(
                "creator must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn sender(&self) -> Sender {
        Sender::from_map(&self.0)
    }
}

fn as_message_id(v: &Value) -> Option<MessageId> {
    v.as_i64()
        .and_then(|id| i32::try_from(id).ok())
        .filter(|id| *id != 0)
        .map(MessageId)
}

fn non_empty_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
