use lobby_store::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Empty name")]
    EmptyName,

    #[error("Empty message")]
    EmptyContent,

    /// The name is not present, e.g. it expired or logged out.
    #[error("Not active, please log in again")]
    NotActive,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error(transparent)]
    Persistence(#[from] PersistError),
}
