use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::error::TrackingError;

/// Error side of every handler. Bodies share the `{success: false, message}`
/// envelope; permission failures also carry the allowed roles.
#[derive(Debug)]
pub enum ApiError {
    Tracking(TrackingError),
    Unauthorized(String),
    BadRequest(String),
}

impl From<TrackingError> for ApiError {
    fn from(err: TrackingError) -> Self {
        ApiError::Tracking(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub fn tracking_status(err: &TrackingError) -> StatusCode {
    match err {
        TrackingError::Validation(_) => StatusCode::BAD_REQUEST,
        TrackingError::NotFound { .. } => StatusCode::NOT_FOUND,
        TrackingError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        TrackingError::NotesRequired { .. } | TrackingError::PhotoEvidenceRequired { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TrackingError::StageOutOfSequence { .. } => StatusCode::CONFLICT,
        TrackingError::GenerationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TrackingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(message: impl Into<String>) -> Value {
    json!({ "success": false, "message": message.into() })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, failure(reason)),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, failure(reason)),
            ApiError::Tracking(err) if err.is_internal() => {
                error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, failure("Server error"))
            }
            ApiError::Tracking(err) => {
                let status = tracking_status(&err);
                let mut body = failure(err.to_string());
                if let TrackingError::PermissionDenied {
                    actor_role,
                    allowed_roles,
                    ..
                } = &err
                {
                    body["allowedRoles"] = json!(allowed_roles);
                    body["actorRole"] = json!(actor_role);
                }
                (status, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use crate::workflows::{Role, Stage};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            tracking_status(&TrackingError::NotesRequired {
                stage: Stage::Reporting
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            tracking_status(&TrackingError::StageOutOfSequence {
                current: Stage::Reception,
                target: Stage::Staining,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            tracking_status(&TrackingError::PermissionDenied {
                stage: Stage::Reporting,
                actor_role: Role::Receptionist,
                allowed_roles: vec![Role::Pathologist, Role::Admin],
            }),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        for fault in [
            StorageError::corrupt("bad timestamp in row 7"),
            StorageError::WriteTask("task 7 panicked".to_string()),
        ] {
            let response = ApiError::from(TrackingError::Persistence(fault)).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Server error");
            let raw = String::from_utf8_lossy(&bytes);
            assert!(!raw.contains("row 7"), "{raw}");
            assert!(!raw.contains("panicked"), "{raw}");
        }
    }
}
