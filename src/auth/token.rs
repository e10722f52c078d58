//! Session tokens.
//!
//! A token is the base64 encoding of the user's email plus the issuance time
//! in wall-clock milliseconds. Nothing is signed; a token is only as good as
//! the directory lookup that follows verification.

use axum::extract::FromRef;
use base64ct::{Base64, Encoding};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    config::{TokenConfig, TokenFormat},
    state::AppState,
};

const DELIMITER: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("no token provided")]
    Missing,
    #[error("token could not be decoded: {0}")]
    Malformed(String),
    #[error("token expired")]
    Expired,
    #[error("token does not belong to a registered user")]
    UnknownUser,
    #[error("user lookup failed: {0}")]
    Lookup(String),
}

/// Issues and verifies session tokens in the configured format.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    pub format: TokenFormat,
    /// Maximum token age in milliseconds; `None` never expires.
    pub max_age_ms: Option<i64>,
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.token)
    }
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl TokenCodec {
    pub fn new(cfg: &TokenConfig) -> Self {
        // A TTL too large to express in milliseconds never expires.
        let max_age_ms = (cfg.ttl_minutes > 0)
            .then(|| cfg.ttl_minutes.checked_mul(60 * 1000))
            .flatten();
        Self {
            format: cfg.format,
            max_age_ms,
        }
    }

    pub fn issue(&self, email: &str) -> String {
        self.issue_at(email, now_millis())
    }

    pub fn issue_at(&self, email: &str, issued_ms: i64) -> String {
        let raw = match self.format {
            TokenFormat::Delimited => format!("{email}{DELIMITER}{issued_ms}"),
            TokenFormat::Legacy => format!("{email}{issued_ms}"),
        };
        debug!(format = ?self.format, "token issued");
        Base64::encode_string(raw.as_bytes())
    }

    /// Recover the email claim. Does not consult the directory.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, now_millis())
    }

    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<String, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        let decoded = Self::decode_raw(token)?;

        let email = match self.format {
            TokenFormat::Delimited => {
                let (email, issued) = decoded
                    .rsplit_once(DELIMITER)
                    .ok_or_else(|| TokenError::Malformed("missing delimiter".into()))?;
                let issued_ms: i64 = issued
                    .parse()
                    .map_err(|_| TokenError::Malformed("invalid timestamp".into()))?;
                if let Some(max_age) = self.max_age_ms {
                    if now_ms.saturating_sub(issued_ms) > max_age {
                        return Err(TokenError::Expired);
                    }
                }
                email.to_string()
            }
            // Splits on the verification time rather than the embedded one, so
            // the email is only recovered within the issuance millisecond.
            TokenFormat::Legacy => {
                let now = now_ms.to_string();
                match decoded.split_once(now.as_str()) {
                    Some((email, _)) => email.to_string(),
                    None => decoded,
                }
            }
        };

        if email.is_empty() {
            return Err(TokenError::Malformed("empty identity".into()));
        }
        Ok(email)
    }

    /// Base64-decode a token into its raw text.
    pub fn decode_raw(token: &str) -> Result<String, TokenError> {
        let bytes =
            Base64::decode_vec(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| TokenError::Malformed(e.to_string()))
    }
}
