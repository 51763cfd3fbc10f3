//! Uniform JSON envelope returned by every resource endpoint.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{ "error": bool, "message": string, "data": optional payload }`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Envelope paired with a status code.
pub struct ApiResponse<T: Serialize> {
    pub status: StatusCode,
    pub body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::success(message, data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Envelope::success(message, data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::message(message),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data() {
        let body = serde_json::to_value(Envelope::success("done", vec![1, 2])).unwrap();
        assert_eq!(body["error"], false);
        assert_eq!(body["message"], "done");
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn message_envelope_omits_data() {
        let body = serde_json::to_value(Envelope::message("deleted")).unwrap();
        assert_eq!(body["error"], false);
        assert!(body.get("data").is_none());
    }

    #[test]
    fn failure_envelope_sets_error_flag() {
        let body = serde_json::to_value(Envelope::failure("boom")).unwrap();
        assert_eq!(body["error"], true);
        assert_eq!(body["message"], "boom");
    }
}
