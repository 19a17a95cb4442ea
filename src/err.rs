#![allow(non_snake_case)]

use axum::async_trait;
use axum::body::HttpBody;
use axum::extract::{FromRequest, RequestParts};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::StoreError;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

pub fn Fine<V>(v: V) -> Success<V>
where
    V: Serialize,
{
    Success::of(v)
}

/// Successful envelope: `{"success": true, "message"?: .., ...value}`.
#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    value: V,
    #[serde(skip)]
    status: StatusCode,
}

impl<V> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            message: None,
            value,
            status: StatusCode::OK,
        }
    }

    /// Attaches the human readable `message` of the envelope.
    pub fn with_message<S: Into<String>>(self, message: S) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    pub fn with_status(self, status: StatusCode) -> Self {
        Self { status, ..self }
    }
}

impl<V> IntoResponse for Success<V>
where
    V: Serialize,
{
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// JSON request body whose rejections (bad syntax, wrong types, missing
/// content type) come back as an `InvalidPayload` envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for JsonBody<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(Error::invalid(rejection.to_string())),
        }
    }
}

/// Payload for responses that carry nothing beyond `success` and `message`.
#[derive(Debug, Clone, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "error")]
pub enum Error {
    #[error("{message}")]
    InvalidPayload { message: String },
    #[error("{message}")]
    AlreadyExists { message: String },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    AuthenticationFailure { message: String },
    #[error("{kind}: {message}")]
    InternalError { kind: &'static str, message: String },
}

#[derive(Serialize)]
struct Failure<'a> {
    success: bool,
    #[serde(flatten)]
    error: &'a Error,
}

impl Error {
    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidPayload { .. }
            | Error::AlreadyExists { .. }
            | Error::AuthenticationFailure { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Error::InternalError { kind, message } = &self {
            log::error!("{} while handling request: {}", kind, message);
        }
        let body = Failure {
            success: false,
            error: &self,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(message) => Self::AlreadyExists { message },
            StoreError::Missing(message) => Self::NotFound { message },
            StoreError::Backend(message) => Self::InternalError {
                kind: "DatabaseError",
                message,
            },
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "HashingError",
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::InternalError {
            kind: "TaskError",
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn failure_envelope_carries_kind_and_message() {
        let err = Error::not_found("Course not found");
        let body = serde_json::to_value(Failure {
            success: false,
            error: &err,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": "NotFound", "message": "Course not found"})
        );
    }

    #[test]
    fn success_envelope_flattens_value() {
        #[derive(Serialize)]
        struct Enrolled {
            enrolled: bool,
        }

        let success = Fine(Enrolled { enrolled: true }).with_message("ok");
        let body: Value = serde_json::to_value(&success).unwrap();
        assert_eq!(body, json!({"success": true, "message": "ok", "enrolled": true}));
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(Error::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::AlreadyExists {
                message: "x".to_string()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::AuthenticationFailure {
                message: "x".to_string()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::from(StoreError::Backend("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
