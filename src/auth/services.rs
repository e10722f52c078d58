use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, warn};

use crate::auth::{
    repo::UserRepository,
    repo_types::{DirectoryError, NewUser, User},
    token::{TokenCodec, TokenError},
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Absent and empty fields are both treated as missing.
fn present(field: Option<&str>) -> Option<&str> {
    field.filter(|v| !v.is_empty())
}

fn missing_fields(fields: &[(&str, Option<&str>)]) -> Option<DirectoryError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| present(*v).is_none())
        .map(|(name, _)| *name)
        .collect();
    (!missing.is_empty()).then(|| DirectoryError::MissingFields(missing.join(", ")))
}

pub async fn email_exists(repo: &dyn UserRepository, email: &str) -> anyhow::Result<bool> {
    Ok(repo.find_by_email(email).await?.is_some())
}

/// Validate and append a new user.
pub async fn register(
    repo: &dyn UserRepository,
    fullname: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<User, DirectoryError> {
    if let Some(err) = missing_fields(&[
        ("fullname", fullname),
        ("email", email),
        ("password", password),
    ]) {
        return Err(err);
    }
    let (fullname, email, password) = (
        fullname.unwrap_or_default(),
        email.unwrap_or_default(),
        password.unwrap_or_default(),
    );

    if !is_valid_email(email) {
        return Err(DirectoryError::InvalidEmail);
    }
    // Conflict wins over password rules.
    if email_exists(repo, email).await? {
        return Err(DirectoryError::DuplicateEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DirectoryError::PasswordTooShort(MIN_PASSWORD_LEN));
    }

    repo.insert(NewUser {
        fullname: fullname.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
    .await
}

pub async fn authenticate(
    repo: &dyn UserRepository,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<User, DirectoryError> {
    if let Some(err) = missing_fields(&[("email", email), ("password", password)]) {
        return Err(err);
    }
    let (email, password) = (email.unwrap_or_default(), password.unwrap_or_default());

    let user = repo
        .find_by_email(email)
        .await?
        .ok_or(DirectoryError::UnknownUser)?;
    if user.password != password {
        warn!(user_id = user.id, "password mismatch");
        return Err(DirectoryError::WrongPassword);
    }
    Ok(user)
}

/// Verify a token and load the user it claims to be.
pub async fn resolve_token(
    repo: &dyn UserRepository,
    codec: &TokenCodec,
    token: &str,
) -> Result<User, TokenError> {
    let email = codec.verify(token)?;
    match repo.find_by_email(&email).await {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "token resolved");
            Ok(user)
        }
        Ok(None) => Err(TokenError::UnknownUser),
        Err(e) => {
            error!(error = %e, "user lookup failed during token resolution");
            Err(TokenError::Lookup(e.to_string()))
        }
    }
}
