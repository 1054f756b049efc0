use std::time::Duration;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use diagnosis_core::{DiagnosisErrorKind, DiagnosisServiceError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Diagnosis service unavailable";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid multipart payload: {0}")]
    Multipart(String),

    #[error(transparent)]
    Diagnosis(#[from] DiagnosisServiceError),

    #[error("Diagnosis did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

#[derive(Serialize)]
struct JsonError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Diagnosis(err) if err.kind() == DiagnosisErrorKind::MalformedRequest => {
                StatusCode::BAD_REQUEST
            }
            AppError::Diagnosis(_) | AppError::DeadlineExceeded(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::BadRequest(message) => JsonError {
                error: message.clone(),
                details: None,
            },
            AppError::Multipart(_) => JsonError {
                error: self.to_string(),
                details: None,
            },
            AppError::Diagnosis(err) => JsonError {
                error: SERVICE_UNAVAILABLE_MESSAGE.to_string(),
                details: Some(err.message().to_string()),
            },
            AppError::DeadlineExceeded(_) => JsonError {
                error: SERVICE_UNAVAILABLE_MESSAGE.to_string(),
                details: Some(self.to_string()),
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_diagnosis_error_body() {
        let err = AppError::from(DiagnosisServiceError::new(
            DiagnosisErrorKind::ModelCall,
            "HTTP error: connection refused",
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], SERVICE_UNAVAILABLE_MESSAGE);
        assert_eq!(json["details"], "HTTP error: connection refused");
    }

    #[actix_web::test]
    async fn test_bad_request_body() {
        let err = AppError::BadRequest("Image required".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Image required");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_malformed_request_is_client_error() {
        let err = AppError::from(DiagnosisServiceError::malformed_request("image is empty"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
