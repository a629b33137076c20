//! API error types and responses.
//!
//! Every rejection leaves the gateway as `{"error":{"code","message"}}`, with
//! a `details` array for malformed requests.

use axum::http::header::{ALLOW, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use scopegate_contract::{FieldViolation, Method};
use scopegate_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid authentication.
    #[error("unauthorized")]
    Unauthorized,

    /// The caller is authenticated but not allowed to do this.
    #[error("forbidden")]
    Forbidden,

    /// No operation is declared for the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path exists but not with this method.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// Methods declared for the path.
        allowed: Vec<Method>,
    },

    /// The request does not satisfy the contract.
    #[error("{message}")]
    BadRequest {
        /// Summary.
        message: String,
        /// Field-level violations.
        details: Vec<FieldViolation>,
    },

    /// The body exceeds the configured limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<FieldViolation>,
}

impl ApiError {
    /// A malformed-request error carrying field violations.
    #[must_use]
    pub fn malformed(details: Vec<FieldViolation>) -> Self {
        Self::BadRequest {
            message: "request does not match the API contract".to_string(),
            details,
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::BadRequest { .. } => "bad_request",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let allow = match &self {
            Self::MethodNotAllowed { allowed } => {
                let joined: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                HeaderValue::from_str(&joined.join(", ")).ok()
            }
            _ => None,
        };

        let details = match self {
            Self::BadRequest { details, .. } => details,
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(allow) = allow {
            response.headers_mut().insert(ALLOW, allow);
        }
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store error");
        Self::Internal("storage error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::MethodNotAllowed { allowed: vec![] }.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::malformed(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::Unauthorized.code(), "unauthorized");
        assert_eq!(ApiError::Forbidden.code(), "forbidden");
        assert_eq!(ApiError::NotFound("test".into()).code(), "not_found");
        assert_eq!(ApiError::malformed(vec![]).code(), "bad_request");
    }

    #[tokio::test]
    async fn malformed_response_carries_details() {
        let response =
            ApiError::malformed(vec![FieldViolation::new("body.name", "is required")]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(body["error"]["details"][0]["location"], "body.name");
        assert_eq!(body["error"]["details"][0]["message"], "is required");
    }

    #[tokio::test]
    async fn details_are_omitted_when_empty() {
        let body = body_json(ApiError::Forbidden.into_response()).await;
        assert_eq!(
            body,
            serde_json::json!({ "error": { "code": "forbidden", "message": "forbidden" } })
        );
    }

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let response = ApiError::MethodNotAllowed {
            allowed: vec![Method::Get, Method::Post],
        }
        .into_response();
        assert_eq!(response.headers()[ALLOW], "GET, POST");
    }

    #[test]
    fn unauthorized_sets_challenge() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn store_errors_are_internal() {
        assert!(matches!(
            ApiError::from(StoreError::KeysExhausted),
            ApiError::Internal(_)
        ));
    }
}
