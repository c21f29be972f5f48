pub mod broadcaster;
pub mod chat;
pub mod error;
pub mod presence;
pub mod sessions;
pub mod sweep;

pub use chat::{Chat, Poll, Session};
pub use error::ChatError;
