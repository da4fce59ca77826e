/// Error types for alignment-service
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] agora_cache::CacheError),

    #[error("Upstream statistical service error: {0}")]
    Upstream(String),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
