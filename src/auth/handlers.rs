use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, CheckEmailRequest, CheckEmailResponse, LoginRequest, PublicUser,
            SignupRequest, UsersResponse, VerifyTokenRequest, VerifyTokenResponse,
        },
        extractors::SessionUser,
        services::{authenticate, email_exists, register, resolve_token},
        token::TokenCodec,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/check-email", post(check_email))
        .route("/verify-token", post(verify_token))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/me", get(get_me))
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = body?;
    let user = register(
        state.users.as_ref(),
        payload.fullname.as_deref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await
    .map_err(|e| {
        warn!(error = %e, "signup rejected");
        ApiError::from(e)
    })?;

    let token = TokenCodec::from_ref(&state).issue(&user.email);

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "Account created successfully".into(),
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = body?;
    let user = authenticate(
        state.users.as_ref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await
    .map_err(|e| {
        warn!(error = %e, "login rejected");
        ApiError::from(e)
    })?;

    let token = TokenCodec::from_ref(&state).issue(&user.email);

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, body))]
pub async fn check_email(
    State(state): State<AppState>,
    body: Result<Json<CheckEmailRequest>, JsonRejection>,
) -> Result<Json<CheckEmailResponse>, ApiError> {
    let Json(payload) = body?;
    let email = payload
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".into()))?;

    let exists = email_exists(state.users.as_ref(), &email).await?;
    let message = if exists {
        "Email already registered"
    } else {
        "Email is available"
    };
    Ok(Json(CheckEmailResponse {
        exists,
        message: message.into(),
    }))
}

#[instrument(skip(state, body))]
pub async fn verify_token(
    State(state): State<AppState>,
    body: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    // An unreadable body carries no token either.
    let token = match body {
        Ok(Json(payload)) => payload.token.unwrap_or_default(),
        Err(rejection) => {
            warn!(error = %rejection, "verify-token body rejected");
            return Err(ApiError::InvalidToken("Token is required".into()));
        }
    };
    let codec = TokenCodec::from_ref(&state);
    let user = resolve_token(state.users.as_ref(), &codec, &token)
        .await
        .map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::from(e)
        })?;

    Ok(Json(VerifyTokenResponse {
        valid: true,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let total_users = state.users.count().await?;
    let users: Vec<PublicUser> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(Json(UsersResponse {
        total_users,
        users,
    }))
}

#[instrument(skip_all)]
pub async fn get_me(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(user.into())
}
