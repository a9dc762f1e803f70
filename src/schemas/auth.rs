use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    #[validate(custom(function = "crate::api::validation::validate_username"))]
    pub(crate) username: String,
    #[serde(default)]
    #[validate(custom(function = "crate::api::validation::validate_password"))]
    pub(crate) password: String,
}

/// Same field rules as login.
pub(crate) type SignupRequest = LoginRequest;

#[derive(Debug, Deserialize)]
pub(crate) struct ForgotPasswordRequest {
    #[serde(default)]
    pub(crate) username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChangePasswordRequest {
    #[serde(default, alias = "newPassword")]
    #[validate(custom(function = "crate::api::validation::validate_password"))]
    pub(crate) new_password: String,
    #[serde(default, alias = "confirmPassword")]
    pub(crate) confirm_password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) expires_at: String,
    pub(crate) user: UserResponse,
    pub(crate) dashboard: &'static str,
    pub(crate) must_change_password: bool,
}
