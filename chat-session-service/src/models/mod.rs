pub mod session;

pub use session::{Message, NewSession, Session};
