// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::envelope::EnvelopeError;
use crate::gateway::GatewayError;
use crate::lifecycle::LifecycleError;
use crate::vault::VaultError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn unprocessable(error_code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, error_code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::NotFound(_) => Self::not_found(message),
            GatewayError::UnknownOutcome(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "unknown_outcome", message)
            }
            GatewayError::Unavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "gateway_unavailable",
                message,
            ),
            GatewayError::Request(_) | GatewayError::InvalidResponse(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "gateway_error", message)
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::Gateway(inner) => inner.into(),
            LifecycleError::Partial { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                "partial_lifecycle_failure",
                message,
            ),
            LifecycleError::PermanentlyDeleted(_) => {
                Self::new(StatusCode::CONFLICT, "permanently_deleted", message)
            }
            LifecycleError::EmptyRevocation => Self::bad_request(message),
            LifecycleError::UnrelatedVersion { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "unrelated_version", message)
            }
            LifecycleError::MalformedAnnotation { .. } => {
                Self::unprocessable("malformed_annotation", message)
            }
        }
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        let message = err.to_string();
        match err {
            VaultError::InvalidInput(_) => Self::bad_request(message),
            VaultError::Envelope(EnvelopeError::Decryption) => {
                Self::unprocessable("decryption_failed", message)
            }
            VaultError::Envelope(_) => Self::unprocessable("invalid_envelope", message),
            VaultError::MalformedPolicy(_) => Self::unprocessable("malformed_policy", message),
            VaultError::PolicyDenied { .. } => {
                Self::new(StatusCode::FORBIDDEN, "access_denied", message)
            }
            VaultError::RecordDeleted { .. } => {
                Self::new(StatusCode::GONE, "record_deleted", message)
            }
            VaultError::Lifecycle(inner) => inner.into(),
            VaultError::Gateway(inner) => inner.into(),
            VaultError::Internal(_) => {
                tracing::error!(error = %message, "Internal error");
                Self::internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code.to_string(),
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RecordId;
    use crate::lifecycle::LifecycleStep;
    use axum::body::to_bytes;

    #[test]
    fn vault_errors_map_to_statuses() {
        let cases = [
            (
                VaultError::PolicyDenied {
                    reason: "no".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                VaultError::RecordDeleted {
                    id: RecordId::from("r"),
                    permanent: false,
                },
                StatusCode::GONE,
            ),
            (
                VaultError::Envelope(EnvelopeError::Decryption),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                VaultError::InvalidInput("empty password".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                VaultError::Gateway(GatewayError::NotFound(RecordId::from("r"))),
                StatusCode::NOT_FOUND,
            ),
            (
                VaultError::Gateway(GatewayError::UnknownOutcome("timeout".into())),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn partial_failure_keeps_the_landed_id() {
        let err = ApiError::from(VaultError::Lifecycle(LifecycleError::Partial {
            completed: LifecycleStep::Backup,
            completed_id: RecordId::from("bk-9"),
            failed: LifecycleStep::Rollback,
            source: GatewayError::Unavailable("down".into()),
        }));
        assert_eq!(err.error_code, "partial_lifecycle_failure");
        assert!(err.message.contains("bk-9"));
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "bad data");
        assert_eq!(body["error_code"], "invalid_input");
    }
}
