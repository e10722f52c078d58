use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

/// User record held by the directory.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,                    // sequential, starts at 1
    pub fullname: String,
    pub email: String,              // unique, case-sensitive
    #[serde(skip_serializing)]
    pub password: String,           // plaintext, never exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields of a user that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub password: String,
}

/// Why a directory operation was refused.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("missing required fields: {0}")]
    MissingFields(String),
    #[error("invalid email format")]
    InvalidEmail,
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("no user registered with this email")]
    UnknownUser,
    #[error("incorrect password")]
    WrongPassword,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
