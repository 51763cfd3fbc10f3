pub mod database;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::PgSessionBackend;
pub use identity::{
    build_verifier, FirebaseTokenVerifier, SharedSecretVerifier, TokenVerifier, VerifiedIdentity,
    VerifyError,
};
pub use memory::InMemorySessionBackend;
pub use self::metrics::{get_metrics, init_metrics};
pub use store::{SessionBackend, SessionStore, StoreError, DEFAULT_OPERATION_TIMEOUT};
