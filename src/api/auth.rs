use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::extract::ApiJson;
use crate::api::guards::AuthenticatedUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc, to_primitive_utc};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, SignupRequest,
};
use crate::schemas::user::UserResponse;
use crate::schemas::MessageResponse;
use crate::services::accounts::DEFAULT_FULL_NAME;

/// Max attempts per window for login and signup, per username.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/forgot-password", post(forgot_password))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/me", get(me))
}

async fn enforce_rate_limit(
    state: &AppState,
    action: &str,
    username: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{}", username.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

fn trimmed(mut payload: LoginRequest) -> LoginRequest {
    payload.username = payload.username.trim().to_string();
    payload.password = payload.password.trim().to_string();
    payload
}

pub(crate) fn dashboard_for(user: &User) -> &'static str {
    user.role().map(UserRole::as_str).unwrap_or("student")
}

async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let payload = trimmed(payload);
    payload.validate().map_err(ApiError::InvalidFields)?;

    enforce_rate_limit(
        &state,
        "login",
        &payload.username,
        "Too many login attempts, try again later",
    )
    .await?;

    let user = repositories::users::find_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &user.password)
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;
    if !verified {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is inactive."));
    }

    let issued = security::issue_access_token(user.user_id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    activity::record(&mut conn, user.user_id, "login", None).await?;

    tracing::info!(user_id = user.user_id, action = "login", "User logged in");

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
        expires_at: format_primitive(to_primitive_utc(issued.expires_at)),
        dashboard: dashboard_for(&user),
        must_change_password: user.force_password_change,
        user: UserResponse::from_db(user),
    }))
}

async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let payload = trimmed(payload);
    payload.validate().map_err(ApiError::InvalidFields)?;

    enforce_rate_limit(
        &state,
        "signup",
        &payload.username,
        "Too many signup attempts, try again later",
    )
    .await?;

    let taken = repositories::users::username_taken(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if taken {
        return Err(ApiError::Conflict("Username already taken.".to_string()));
    }

    let password_hash = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            username: &payload.username,
            password_hash: &password_hash,
            full_name: Some(DEFAULT_FULL_NAME),
            email: None,
            phone: None,
            gender: None,
            role: UserRole::Student,
            force_password_change: false,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict("Username already taken.".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(user_id = user.user_id, action = "signup", "Account created");

    Ok((StatusCode::CREATED, Json(MessageResponse::new("Account created successfully!"))))
}

async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    let user = repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    match user {
        Some(_) => Ok(Json(MessageResponse::new("Password reset link sent!"))),
        None => Err(ApiError::NotFound("User not found.".to_string())),
    }
}

async fn logout(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions().revoke(auth.session_id(), security::remaining_lifetime(&auth.claims)).await;
    state.sessions().clear_credentials(auth.session_id()).await;

    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    activity::record(&mut conn, auth.user.user_id, "logout", None).await?;

    Ok(Json(MessageResponse::new("Logged out.")))
}

/// Allowed while a forced change is pending; ends the current session on success.
async fn change_password(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    if payload.new_password != payload.confirm_password {
        return Err(ApiError::BadRequest("Passwords do not match.".to_string()));
    }

    let password_hash = security::hash_password(&payload.new_password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    repositories::users::set_password(&mut *tx, auth.user.user_id, &password_hash, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update password"))?;
    activity::record(&mut tx, auth.user.user_id, "change_password", None).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    state.sessions().revoke(auth.session_id(), security::remaining_lifetime(&auth.claims)).await;

    tracing::info!(user_id = auth.user.user_id, action = "change_password", "Password changed");

    Ok(Json(MessageResponse::new("Password updated. Please log in again.")))
}

async fn me(auth: AuthenticatedUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(auth.user))
}
