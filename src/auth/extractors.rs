use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{repo_types::User, services::resolve_token, token::TokenCodec};
use crate::{error::ApiError, state::AppState};

/// Resolves `Authorization: Bearer <token>` to a registered user.
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::InvalidToken("Missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::InvalidToken("Invalid auth scheme".into()))?;

        let codec = TokenCodec::from_ref(state);
        let user = resolve_token(state.users.as_ref(), &codec, token)
            .await
            .map_err(|e| {
                warn!(error = %e, "bearer token rejected");
                ApiError::from(e)
            })?;
        Ok(SessionUser(user))
    }
}
