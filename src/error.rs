use thiserror::Error;

#[derive(Debug, Error)]
pub enum BugError {
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),

    #[error("DUPLICATE_ID: a bug with id {0} already exists")]
    DuplicateId(String),

    /// Stored JSON failed to decode. Readers recover by treating the value as absent.
    #[error("STORAGE_CORRUPT: {0}")]
    StorageCorrupt(String),

    #[error("STORAGE_ERROR: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("STORAGE_ERROR: could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("SERIALIZE_ERROR: {0}")]
    Serialize(String),

    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),
}

impl From<BugError> for String {
    fn from(err: BugError) -> Self {
        err.to_string()
    }
}

pub type BugResult<T> = Result<T, BugError>;
