//! Error-to-response mapping.
//!
//! Validation failures produce a 422 with a body shaped
//! `{location: {field: [messages]}}`; everything else maps onto a status
//! code with a `{"detail": ...}` body.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::pool::PoolError;
use crate::server::ServiceError;
use crate::store::StoreError;

/// Field-level validation failures for one request location ("body",
/// "path", "query").
#[derive(Debug, Default)]
pub struct ValidationErrors {
    location: &'static str,
    fields: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn in_body() -> Self {
        Self {
            location: "body",
            fields: HashMap::new(),
        }
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Bail out of a handler when any field failed.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed payload fields. HTTP 422.
    Validation(ValidationErrors),
    /// Missing or unknown credentials. HTTP 403; the auth layer clears the
    /// cookie separately.
    AuthMissing,
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Service(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ (errors.location): errors.fields })),
            )
                .into_response(),
            Self::AuthMissing => detail(StatusCode::FORBIDDEN, "Player is not authenticated"),
            Self::Service(err) => service_response(err),
        }
    }
}

fn service_response(err: ServiceError) -> Response {
    match err {
        ServiceError::BadState(message) => detail(StatusCode::BAD_REQUEST, &message),
        ServiceError::Forbidden(message) => detail(StatusCode::FORBIDDEN, &message),
        ServiceError::NotFound(message) => detail(StatusCode::NOT_FOUND, &message),
        ServiceError::Conflict(message) => detail(StatusCode::CONFLICT, &message),
        ServiceError::Pool(err) => pool_response(err),
        ServiceError::Store(err) => store_response(err),
    }
}

fn pool_response(err: PoolError) -> Response {
    match &err {
        PoolError::RoomNotFound(_) | PoolError::PlayerNotFound(_) => {
            detail(StatusCode::NOT_FOUND, &err.to_string())
        }
        PoolError::NotInRoom { .. } => detail(StatusCode::BAD_REQUEST, &err.to_string()),
        PoolError::PlayerAlreadyPresent(_) | PoolError::RoomAlreadyExists(_) => {
            detail(StatusCode::CONFLICT, &err.to_string())
        }
        PoolError::RoomNotEmpty(_) | PoolError::LobbyImmortal => {
            detail(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn store_response(err: StoreError) -> Response {
    match &err {
        StoreError::DuplicatePlayerName(_) | StoreError::DuplicateRoomName(_) => {
            detail(StatusCode::CONFLICT, &err.to_string())
        }
        StoreError::NotFound { .. } => detail(StatusCode::NOT_FOUND, &err.to_string()),
        StoreError::Database(_) | StoreError::Encoding(_) => {
            tracing::error!(error = %err, "storage failure surfaced to a request");
            detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_body_shape() {
        let mut errors = ValidationErrors::in_body();
        errors.add("name", "ensure this value has at most 10 characters");
        errors.add("name", "must not be empty");
        errors.add("capacity", "must be between 1 and 10");

        let response = ApiError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::in_body().into_result().is_ok());
    }

    #[test]
    fn test_service_error_statuses() {
        let cases = [
            (
                ServiceError::BadState("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Forbidden("x".into()),
                StatusCode::FORBIDDEN,
            ),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ServiceError::Pool(PoolError::RoomNotFound(7)),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Store(StoreError::DuplicateRoomName("x".into())),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::Service(err).into_response().status(), status);
        }
    }
}
