pub mod auth;
pub mod session_id;
pub mod validated_json;

pub use auth::AuthenticatedUser;
pub use session_id::SessionId;
pub use validated_json::ValidatedJson;
