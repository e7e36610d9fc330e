use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, MessageResponse, SignupRequest},
        jwt::{AuthUser, JwtKeys},
        repo_types::User,
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .credentials
        .signup(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Signup successful!",
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .credentials
        .login(&payload.email, &payload.password)
        .await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.name).map_err(|e| {
        error!(error = %e, "session sign failed");
        AppError::Internal
    })?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        name: user.name,
        token,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<User>, AppError> {
    let user = state.credentials.user(claims.sub).await?;
    Ok(Json(user))
}
