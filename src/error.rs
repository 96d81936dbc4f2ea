use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    state::{ingestion::ScoringError, lifecycle::LifecycleError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation is not allowed in the match's current state.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    /// The match changed underneath the operation.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::UnknownTossWinner(_) => ServiceError::InvalidInput(err.to_string()),
            other => ServiceError::PreconditionFailed(other.to_string()),
        }
    }
}

impl From<ScoringError> for ServiceError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::InvalidInput(message) => ServiceError::InvalidInput(message),
            other => ServiceError::PreconditionFailed(other.to_string()),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
///
/// The wrapped message is returned verbatim so clients can display it.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("{0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source @ StorageError::Corrupt { .. }) => {
                AppError::Internal(source.to_string())
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::PreconditionFailed(message) => AppError::BadRequest(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_http_status() {
        assert_eq!(
            status_of(ServiceError::NotFound("Match not found".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::PreconditionFailed("Match is not live".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::InvalidInput("striker is required".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Conflict("match changed".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(ServiceError::Timeout), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(ServiceError::Unavailable(StorageError::unavailable(
                "down".into(),
                io::Error::other("refused")
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ServiceError::Unavailable(StorageError::corrupt("M1", "bad"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_messages_are_kept_verbatim() {
        let err: ServiceError = ScoringError::NoInnings.into();
        let app = AppError::from(err);
        assert_eq!(
            app.to_string(),
            "No innings found. Match may not be properly started."
        );

        let err: ServiceError = LifecycleError::MissingToss.into();
        assert!(matches!(err, ServiceError::PreconditionFailed(_)));
    }
}
