use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, RegisterResponse},
        extractors::Caller,
        jwt::{JwtKeys, TokenPair},
        services,
    },
    error::AppResult,
    extract::{AppJson, FormJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register/", post(register))
        .route("/auth/login/", post(login))
        .route("/auth/token/refresh/", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me/", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    FormJson(payload): FormJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let (user, tokens) = services::register(state.users.as_ref(), &keys, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            tokens,
            message: "User registered successfully",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    FormJson(payload): FormJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let (user, tokens) = services::login(state.users.as_ref(), &keys, payload).await?;
    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let keys = JwtKeys::from_ref(&state);
    let tokens = services::refresh(state.users.as_ref(), &keys, &payload.refresh_token).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, caller: Caller) -> AppResult<Json<PublicUser>> {
    let user = services::me(state.users.as_ref(), &caller).await?;
    Ok(Json(user.into()))
}
