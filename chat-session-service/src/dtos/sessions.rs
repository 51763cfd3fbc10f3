use crate::models::Message;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// `sender` is free-form; any role string, including an empty one, is stored as sent.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePayload {
    pub sender: String,
    pub content: String,
    /// Opaque client timestamp, stored verbatim.
    #[serde(default)]
    pub timestamp: String,
}

impl From<MessagePayload> for Message {
    fn from(payload: MessagePayload) -> Self {
        Message {
            sender: payload.sender,
            content: payload.content,
            timestamp: payload.timestamp,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub user_id: i64,
    #[validate(length(min = 1, max = 255, message = "session_name must be 1-255 characters"))]
    pub session_name: String,
    #[serde(default)]
    pub conversation: Vec<MessagePayload>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppendMessagesRequest {
    #[validate(length(min = 1, message = "messages must not be empty"))]
    pub messages: Vec<MessagePayload>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsParams {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreatedSessionResponse {
    pub session_id: i64,
}
