//! Storage-specific error type wrapping sqlx errors.

use plughub_domain::error::PlugHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize a value into its stored JSON form.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// A repeat period does not fit in a database integer.
    #[error("repeat period of rule {0:?} is out of range")]
    RepeatOutOfRange(String),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for PlugHubError {
    fn from(err: StorageError) -> Self {
        Self::Persistence(Box::new(err))
    }
}
