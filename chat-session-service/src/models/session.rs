use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One turn of a conversation.
///
/// `sender` is deliberately a free-form string ("user", "assistant", ...) and
/// `timestamp` is stored exactly as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub content: String,
    pub timestamp: String,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// A persisted chat session and its ordered conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub session_name: String,
    pub conversation: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload handed to a backend. `created_at` is stamped by the store,
/// never by the caller.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub session_name: String,
    pub conversation: Vec<Message>,
    pub created_at: DateTime<Utc>,
}
