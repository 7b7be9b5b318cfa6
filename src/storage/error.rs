use thiserror::Error;

/// Errors raised by specimen / ledger persistence
#[derive(Debug, Error)]
pub enum StorageError {
    /// The unique constraint on accession numbers rejected an insert
    #[error("accession number {0} is already in use")]
    DuplicateAccession(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The task running a write transaction panicked or was aborted
    #[error("write task did not complete: {0}")]
    WriteTask(String),

    #[error("stored record is corrupt: {reason}")]
    Corrupt { reason: String },

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        StorageError::Corrupt {
            reason: reason.into(),
        }
    }
}
