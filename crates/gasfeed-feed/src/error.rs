//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Undecodable frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid tier value for {label}: {reason}")]
    InvalidTier { label: String, reason: String },
}

pub type FeedResult<T> = Result<T, FeedError>;
