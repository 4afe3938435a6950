//! Mapping of core errors onto HTTP responses.

use api_shared::ErrorBody;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use healthcure_core::{CoreError, ErrorKind};

#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    /// The request could not be decoded.
    Malformed(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Malformed(message) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
            }
            ApiError::Core(err) => err,
        };

        let status = status_for(err.kind());
        let mut body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {:?}", err);
            ErrorBody::new("internal server error")
        } else {
            ErrorBody::new(err.to_string())
        };
        if let CoreError::IncompletePatient {
            patient_id,
            missing_fields,
        } = &err
        {
            body.missing_fields = Some(missing_fields.iter().map(|f| f.to_string()).collect());
            body.patient_id = Some(patient_id.to_string());
        }

        (status, Json(body)).into_response()
    }
}

/// `Json` whose rejection answers with the JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejection answers with the JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `Query` whose rejection answers with the JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use healthcure_uuid::RecordId;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_kinds_map_to_statuses() {
        let cases = [
            (CoreError::invalid("bad"), StatusCode::BAD_REQUEST),
            (CoreError::Unauthenticated("no"), StatusCode::UNAUTHORIZED),
            (CoreError::Forbidden("no"), StatusCode::FORBIDDEN),
            (CoreError::NotFound("patient"), StatusCode::NOT_FOUND),
            (CoreError::conflict("dup"), StatusCode::CONFLICT),
            (CoreError::LockPoisoned("users"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response = ApiError::from(CoreError::LockPoisoned("users")).into_response();
        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn test_incomplete_patient_lists_missing_fields() {
        let patient_id = RecordId::new();
        let response = ApiError::from(CoreError::IncompletePatient {
            patient_id,
            missing_fields: vec!["dateOfBirth", "gender"],
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body["missingFields"], serde_json::json!(["dateOfBirth", "gender"]));
        assert_eq!(body["patientId"], patient_id.to_string());
    }
}
