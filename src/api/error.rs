use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use super::auth::AuthScheme;
use crate::db::StoreError;
use crate::services::AuthError;

/// A `WWW-Authenticate` challenge attached to a 401.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub scheme: AuthScheme,
    pub realm: String,
}

impl Challenge {
    fn header_value(&self) -> String {
        match self.scheme {
            AuthScheme::Basic => format!("Basic realm=\"{}\"", self.realm),
            AuthScheme::Bearer => format!("Bearer realm=\"{}\"", self.realm),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed input.
    ValidationError(String),

    NotFound(String),

    Conflict(String),

    /// Missing or invalid credentials. Carries a challenge when raised by
    /// an auth scheme.
    Unauthorized {
        message: String,
        challenge: Option<Challenge>,
    },

    /// Valid identity, insufficient privilege.
    Forbidden(String),

    /// A write affected an unexpected row count or stored data failed to
    /// decode. Fatal to the operation; detail goes to the log only.
    IntegrityError(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::Unauthorized { message, .. } => write!(f, "Unauthorized: {message}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::IntegrityError(msg) => write!(f, "Integrity error: {msg}"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut www_authenticate = None;

        let (status, error_message) = match &self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Unauthorized { message, challenge } => {
                www_authenticate = challenge.as_ref().map(Challenge::header_value);
                (StatusCode::UNAUTHORIZED, message.clone())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::IntegrityError(msg) => {
                tracing::error!("Integrity error: {}", msg);
                (StatusCode::BAD_REQUEST, "integrity violation".to_string())
            }
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    "a database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    "an internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        let mut response = (status, Json(body)).into_response();

        if let Some(value) = www_authenticate
            && let Ok(value) = HeaderValue::from_str(&value)
        {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }

        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Forbidden(msg) => ApiError::Forbidden(msg),
            StoreError::Validation(msg) => ApiError::ValidationError(msg),
            StoreError::Integrity(msg) => ApiError::IntegrityError(msg),
            StoreError::Db(e) => ApiError::DatabaseError(e.to_string()),
            StoreError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized {
                message: "invalid credentials".to_string(),
                challenge: None,
            },
            AuthError::Store(e) => ApiError::from(e),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{resource} {id} not found"))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }

    /// A 401 carrying the scheme's challenge header.
    pub fn unauthorized(message: impl Into<String>, scheme: AuthScheme, realm: &str) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            challenge: Some(Challenge {
                scheme,
                realm: realm.to_string(),
            }),
        }
    }
}
