use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("frame blob truncated: length prefix says {expected} payload bytes, got {actual}")]
    TruncatedBlob { expected: usize, actual: usize },
    #[error("frame blob encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("frame blob decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
