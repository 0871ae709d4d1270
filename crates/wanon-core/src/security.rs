use std::collections::HashSet;

use crate::domain::ChatId;

// ============== Chat Allowlist ==============

/// Static allowlist of chats the bot serves.
///
/// An empty list allows every chat.
#[derive(Clone, Debug, Default)]
pub struct ChatFilter {
    allowed: HashSet<i64>,
    auto_leave: bool,
}

impl ChatFilter {
    pub fn new(allowed_chat_ids: &[i64], auto_leave: bool) -> Self {
        Self {
            allowed: allowed_chat_ids.iter().copied().collect(),
            auto_leave,
        }
    }

    pub fn allows_all(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn is_allowed(&self, chat_id: ChatId) -> bool {
        self.allows_all() || self.allowed.contains(&chat_id.0)
    }

    /// Whether the bot should leave a chat it is not allowed in.
    pub fn auto_leave(&self) -> bool {
        self.auto_leave
    }
}
