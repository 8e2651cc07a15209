//! Auth handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::models::UserInfo;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_pic: Option<String>,
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /auth/signup - {}", req.email);

    match state.auth.signup(req.email, req.username, req.password).await {
        Ok((user, session)) => {
            info!("User {} registered", user.username);
            Ok(Json(AuthResponse {
                token: session.token,
                user,
            }))
        }
        Err(e) => {
            warn!("Signup failed: {}", e);
            Err(Error::BadRequest(e.to_string()))
        }
    }
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /auth/login - {}", req.email);

    match state.auth.login(req.email, req.password).await {
        Ok((user, session)) => Ok(Json(AuthResponse {
            token: session.token,
            user,
        })),
        Err(e) => {
            warn!("Login failed: {}", e);
            Err(Error::LoginFail)
        }
    }
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, ctx: Ctx) -> Result<StatusCode> {
    info!("POST /auth/logout - {}", ctx.user().username);

    state.auth.logout(ctx.token()).await?;

    Ok(StatusCode::OK)
}

/// GET /auth/me
pub async fn me(ctx: Ctx) -> Json<UserInfo> {
    info!("GET /auth/me - {}", ctx.user().username);

    Json(ctx.user().clone())
}

/// PUT /auth/me
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserInfo>> {
    info!("PUT /auth/me - {}", ctx.user().username);

    match state
        .auth
        .update_profile(ctx.user_id(), req.username, req.email, req.profile_pic)
        .await
    {
        Ok(user) => Ok(Json(user)),
        Err(e) => {
            warn!("Profile update failed: {}", e);
            Err(Error::BadRequest(e.to_string()))
        }
    }
}
