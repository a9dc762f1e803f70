use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, security::Claims, state::AppState};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;

/// Valid token for an active user whose login session has not been revoked.
/// Accepted even while a password change is pending.
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatedUser {
    pub(crate) user: User,
    pub(crate) claims: Claims,
}

impl AuthenticatedUser {
    pub(crate) fn session_id(&self) -> &str {
        &self.claims.sid
    }
}

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);
pub(crate) struct CurrentTeacher(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) User);
/// Admin or teacher.
pub(crate) struct CurrentStaff(pub(crate) User);
/// Login session id of the caller, for per-session state such as issued credentials.
pub(crate) struct SessionId(pub(crate) String);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(cached.clone());
        }

        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(ApiError::login_required)?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::login_required())?;
        let user_id = claims.user_id().ok_or_else(ApiError::login_required)?;

        if app_state.sessions().is_revoked(&claims.sid).await {
            return Err(ApiError::login_required());
        }

        let user = repositories::users::find_by_id(app_state.db(), user_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?
            .ok_or_else(ApiError::login_required)?;

        if !user.is_active {
            return Err(ApiError::login_required());
        }

        let authenticated = AuthenticatedUser { user, claims };
        parts.extensions.insert(authenticated.clone());
        Ok(authenticated)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser { user, .. } =
            AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.force_password_change {
            return Err(ApiError::PasswordChangeRequired);
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionId {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authenticated = AuthenticatedUser::from_request_parts(parts, state).await?;
        Ok(SessionId(authenticated.claims.sid))
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[UserRole],
) -> Result<User, ApiError> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

    match user.role() {
        Some(role) if allowed.contains(&role) => Ok(user),
        _ => Err(ApiError::login_required()),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Admin]).await.map(CurrentAdmin)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Teacher]).await.map(CurrentTeacher)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Student]).await.map(CurrentStudent)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Admin, UserRole::Teacher]).await.map(CurrentStaff)
    }
}
