use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::{repo_types::DirectoryError, token::TokenError};

/// Error returned by every API handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    NotFound {
        message: String,
        user_exists: Option<bool>,
    },
    #[error("{message}")]
    Unauthorized {
        message: String,
        user_exists: Option<bool>,
    },
    #[error("{0}")]
    InvalidToken(String),
    #[error("{message}")]
    Conflict {
        message: String,
        user_exists: Option<bool>,
    },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized { .. } | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (user_exists, valid) = match &self {
            Self::NotFound { user_exists, .. }
            | Self::Unauthorized { user_exists, .. }
            | Self::Conflict { user_exists, .. } => (*user_exists, None),
            Self::InvalidToken(_) => (None, Some(false)),
            _ => (None, None),
        };
        // Internal details stay in the logs.
        let message = match &self {
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            success: false,
            error: self.kind(),
            message,
            user_exists,
            valid,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::MissingFields(fields) => {
                Self::Validation(format!("Missing required fields: {fields}"))
            }
            DirectoryError::InvalidEmail => Self::Validation("Invalid email format".into()),
            DirectoryError::PasswordTooShort(min) => {
                Self::Validation(format!("Password must be at least {min} characters"))
            }
            DirectoryError::DuplicateEmail => Self::Conflict {
                message: "Email already registered. Please log in instead.".into(),
                user_exists: Some(true),
            },
            DirectoryError::UnknownUser => Self::NotFound {
                message: "No account found with this email. Please sign up first.".into(),
                user_exists: Some(false),
            },
            DirectoryError::WrongPassword => Self::Unauthorized {
                message: "Incorrect password. Please try again.".into(),
                user_exists: Some(true),
            },
            DirectoryError::Storage(e) => Self::Internal(e),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        let message = match e {
            TokenError::Missing => "Token is required".to_string(),
            TokenError::Malformed(_) => "Invalid token format".to_string(),
            TokenError::Expired => "Token expired. Please log in again.".to_string(),
            TokenError::UnknownUser => "Invalid token: user not found".to_string(),
            TokenError::Lookup(msg) => return Self::Internal(anyhow::anyhow!(msg)),
        };
        Self::InvalidToken(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "request body rejected");
        Self::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}
