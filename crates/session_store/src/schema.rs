use chat_provider::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::title::derive_title;

pub const SCHEMA_VERSION: u32 = 1;

/// One persisted conversation thread.
///
/// `messages` is authoritative; `title` and `last_updated` are derived side
/// fields maintained by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Epoch milliseconds of the last persisted mutation.
    pub last_updated: i64,
}

impl Session {
    /// Allocates a new session holding only `first_message`.
    #[must_use]
    pub fn create(owner_id: impl Into<String>, first_message: &Message, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: derive_title(&first_message.content),
            messages: vec![first_message.clone()],
            last_updated: now,
        }
    }

    /// Overwrites the full message sequence and advances `last_updated` in one step.
    pub fn replace_messages(&mut self, messages: Vec<Message>, now: i64) {
        self.messages = messages;
        self.last_updated = next_last_updated(self.last_updated, now);
    }
}

/// Returns a `last_updated` value strictly greater than `previous`.
#[must_use]
pub fn next_last_updated(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

/// On-disk envelope: the session wire form plus a schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionDocument {
    pub schema_version: u32,
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub last_updated: i64,
}

impl From<Session> for SessionDocument {
    fn from(session: Session) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: session.id,
            owner_id: session.owner_id,
            title: session.title,
            messages: session.messages,
            last_updated: session.last_updated,
        }
    }
}

impl From<SessionDocument> for Session {
    fn from(document: SessionDocument) -> Self {
        Self {
            id: document.id,
            owner_id: document.owner_id,
            title: document.title,
            messages: document.messages,
            last_updated: document.last_updated,
        }
    }
}

/// Orders sessions most-recently-updated first; ties break on id for stability.
pub(crate) fn sort_by_recency(sessions: &mut [Session]) {
    sessions.sort_by(|left, right| {
        right
            .last_updated
            .cmp(&left.last_updated)
            .then_with(|| left.id.cmp(&right.id))
    });
}

#[cfg(test)]
mod tests {
    use chat_provider::Message;

    use super::*;

    #[test]
    fn create_derives_title_from_first_message() {
        let first = Message::user("Explain lifetimes in this snippet please", Vec::new(), 10);
        let session = Session::create("owner-1", &first, 10);

        assert_eq!(session.owner_id, "owner-1");
        assert_eq!(session.title, "Explain lifetimes in this snip...");
        assert_eq!(session.messages, vec![first]);
        assert_eq!(session.last_updated, 10);
    }

    #[test]
    fn replace_messages_always_advances_last_updated() {
        let first = Message::user("hi", Vec::new(), 10);
        let mut session = Session::create("owner-1", &first, 100);

        session.replace_messages(vec![first.clone()], 50);
        assert_eq!(session.last_updated, 101);

        session.replace_messages(vec![first], 500);
        assert_eq!(session.last_updated, 500);
    }

    #[test]
    fn sort_by_recency_is_descending() {
        let first = Message::user("hi", Vec::new(), 1);
        let mut older = Session::create("o", &first, 1);
        older.id = "b".to_string();
        let mut newer = Session::create("o", &first, 2);
        newer.id = "a".to_string();

        let mut sessions = vec![older.clone(), newer.clone()];
        sort_by_recency(&mut sessions);
        assert_eq!(sessions, vec![newer, older]);
    }
}
