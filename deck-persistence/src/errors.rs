use deck_core::ShuffleError;
use sea_orm::{DbErr, SqlErr};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(#[source] DbErr),
    #[error("Card row {id} holds an invalid rank or suit")]
    CorruptCard { id: i32 },
    #[error(transparent)]
    Shuffle(#[from] ShuffleError),
    #[error("Storage request aborted before replying")]
    RequestAborted,
    #[error("Storage worker is not running")]
    WorkerUnavailable,
}

impl From<DbErr> for StorageError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => StorageError::DuplicateKey(message),
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                StorageError::ForeignKeyViolation(message)
            }
            _ => StorageError::Unavailable(err),
        }
    }
}
