use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock: cannot remove {requested} items, current stock is {available}")]
    InsufficientStock { available: i64, requested: i64 },
}

pub type Result<T> = std::result::Result<T, Error>;
