pub mod sessions;

pub use sessions::{
    AppendMessagesRequest, CreateSessionRequest, CreatedSessionResponse, ListSessionsParams,
    MessagePayload,
};
