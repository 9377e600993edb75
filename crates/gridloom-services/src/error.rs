use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-friendly messages
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Another row is already being edited")]
    EditInProgress,

    #[error("No row is being edited")]
    NoActiveEdit,

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Refresh failed: {0}")]
    RefreshFailed(String),
}
