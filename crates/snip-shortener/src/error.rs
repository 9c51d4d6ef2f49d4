use snip_core::{CoreError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenerError {
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("alias already exists: {0}")]
    AliasConflict(String),
    #[error("no free short code after {attempts} attempts")]
    AliasSpaceExhausted { attempts: usize },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidAlias(message),
        }
    }
}
