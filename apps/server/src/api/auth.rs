//! Registration, login and current-user endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::main_lib::AppState;
use crate::models::{LoginRequest, RegisterRequest, TokenResponse, UserSummary};
use crate::users::{hash_password, verify_password, NewUser};

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserSummary>)> {
    let username = payload.username.trim().to_string();
    if username.len() < 3 {
        return Err(ApiError::BadRequest(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;
    let user = state.user_store.insert(NewUser {
        username,
        email: payload.email,
        password_hash,
    })?;

    tracing::info!("Registered user '{}'", user.username);
    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    // One generic rejection for unknown user and wrong password alike.
    let rejected = || ApiError::Unauthorized("Incorrect username or password".to_string());

    let user = state
        .user_store
        .find(payload.username.trim())
        .ok_or_else(rejected)?;
    let matches = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {e}")))?;
    if !matches {
        return Err(rejected());
    }

    let token = state.auth.issue_token(&user.username)?;
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
) -> ApiResult<Json<UserSummary>> {
    let user = state
        .user_store
        .find(&username)
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))?;
    Ok(Json(UserSummary::from(&user)))
}
