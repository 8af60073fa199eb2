use thiserror::Error;

/// Storage-specific error types for puerta.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity not found in database
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Unique constraint violated, e.g. a handle that is already taken
    #[error("Duplicate {entity_type}: {value}")]
    Duplicate { entity_type: String, value: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub fn not_found(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Translate a unique-constraint failure into [`StorageError::Duplicate`],
    /// passing every other error through.
    pub(crate) fn on_unique_violation(
        err: sqlx::Error,
        entity_type: &str,
        value: &str,
    ) -> Self {
        if let sqlx::Error::Database(db) = &err
            && db.is_unique_violation()
        {
            return Self::Duplicate {
                entity_type: entity_type.to_string(),
                value: value.to_string(),
            };
        }
        Self::Database(err)
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
