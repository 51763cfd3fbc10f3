pub mod health;
pub mod sessions;

pub use health::{health_check, metrics_endpoint, ping, readiness_check};
pub use sessions::{append_messages, create_session, delete_session, get_session, list_sessions};
