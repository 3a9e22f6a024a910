//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use fileshare_core::error::FileshareError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<FileshareError> for ApiError {
    fn from(err: FileshareError) -> Self {
        let status = match &err {
            FileshareError::EmptyName
            | FileshareError::EmptyContent
            | FileshareError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FileshareError::InvalidContentAddress(_) => StatusCode::BAD_REQUEST,
            FileshareError::NotRegistered(_) | FileshareError::UserRejected => StatusCode::FORBIDDEN,
            FileshareError::AlreadyRegistered(_) | FileshareError::PublishInProgress => {
                StatusCode::CONFLICT
            }
            FileshareError::NotFound(_) | FileshareError::IndexOutOfRange { .. } => {
                StatusCode::NOT_FOUND
            }
            FileshareError::NoProvider(_)
            | FileshareError::ConnectionLost(_)
            | FileshareError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            FileshareError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FileshareError::RpcError { .. }
            | FileshareError::InvalidResponse(_)
            | FileshareError::CatalogIntegrity(_) => StatusCode::BAD_GATEWAY,
            _ => {
                tracing::error!(error = %err, "Internal error");
                return ApiError::internal("An internal error occurred");
            }
        };

        ApiError::new(status, err.to_string(), err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (FileshareError::NotRegistered("0xabc".into()), StatusCode::FORBIDDEN),
            (FileshareError::PublishInProgress, StatusCode::CONFLICT),
            (FileshareError::IndexOutOfRange { index: 9, count: 1 }, StatusCode::NOT_FOUND),
            (FileshareError::EmptyContent, StatusCode::UNPROCESSABLE_ENTITY),
            (FileshareError::ConnectionLost("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (FileshareError::Timeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (FileshareError::ConfigError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = ApiError::from(FileshareError::InternalError("secret detail".into()));
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert!(!err.message.contains("secret"));
    }
}
