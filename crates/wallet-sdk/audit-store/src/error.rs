use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("store is closed")]
    ClosedStore,

    #[error("schema mismatch: expected version {expected}, found {found}")]
    SchemaMismatch { expected: i64, found: i64 },
}
