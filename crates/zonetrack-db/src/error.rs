use thiserror::Error;
use zonetrack_core::CoreError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp in database: {0}")]
    InvalidTimestamp(String),

    #[error("Tag id is required")]
    MissingTagId,

    #[error("Tag already registered: {tag_id}")]
    TagExists { tag_id: String },

    #[error("Tag not found: {tag_id}")]
    TagNotFound { tag_id: String },
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::MissingTagId => CoreError::ValidationFailed {
                message: err.to_string(),
            },
            DbError::TagExists { tag_id } => CoreError::TagExists { tag_id },
            DbError::TagNotFound { tag_id } => CoreError::TagNotFound { tag_id },
            DbError::Db(_) | DbError::Io(_) | DbError::InvalidTimestamp(_) => CoreError::Store {
                message: err.to_string(),
            },
        }
    }
}
