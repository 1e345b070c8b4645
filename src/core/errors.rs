use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Coarse error category, used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input, raised before any I/O.
    Validation,
    /// An external provider (embedding service, mail/chat API, file extractor) failed.
    Dependency,
    /// The operation was attempted in the wrong lifecycle state.
    State,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("no documents provided")]
    NoDocuments,
    #[error("metadata length mismatch: {documents} documents but {metadata} metadata entries")]
    MetadataLengthMismatch { documents: usize, metadata: usize },
    #[error("unsupported file extension: {0}")]
    UnsupportedFormat(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding service error: {0}")]
    EmbeddingService(String),
    #[error("timed out after {0}s waiting for the embedding service")]
    Timeout(u64),
    #[error("source fetch failed: {0}")]
    Source(String),
    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("vector store not initialized, ingest documents first")]
    StoreUninitialized,
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    NotRunning,
    #[error("ingestion cancelled")]
    Cancelled,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::EmbeddingService(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::NoDocuments
            | RagError::MetadataLengthMismatch { .. }
            | RagError::UnsupportedFormat(_)
            | RagError::InvalidArgument(_)
            | RagError::DimensionMismatch { .. } => ErrorKind::Validation,
            RagError::EmbeddingService(_)
            | RagError::Timeout(_)
            | RagError::Source(_)
            | RagError::Extraction(_) => ErrorKind::Dependency,
            RagError::StoreUninitialized
            | RagError::AlreadyRunning
            | RagError::NotRunning
            | RagError::Cancelled => ErrorKind::State,
            RagError::JobNotFound(_) => ErrorKind::NotFound,
            RagError::Storage(_) | RagError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for RagError {
    fn from(err: sqlx::Error) -> Self {
        RagError::Storage(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("gateway timeout: {0}")]
    GatewayTimeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        if matches!(err, RagError::Timeout(_)) {
            return ApiError::GatewayTimeout(message);
        }
        match err.kind() {
            ErrorKind::Validation => ApiError::BadRequest(message),
            ErrorKind::Dependency => ApiError::BadGateway(message),
            ErrorKind::State => ApiError::Conflict(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Internal => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
