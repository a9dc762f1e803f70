use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::db::models::Role;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::role::{RoleCreated, RolePayload};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_roles).post(create_role)).route(
        "/:role_id",
        axum::routing::put(update_role).patch(update_role).delete(delete_role),
    )
}

async fn list_roles(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Role>>, ApiError> {
    let roles = repositories::roles::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list roles"))?;
    Ok(Json(roles))
}

fn duplicate_or_internal(err: sqlx::Error, context: &str) -> ApiError {
    if crate::db::is_unique_violation(&err) {
        ApiError::Conflict("role_name already exists".to_string())
    } else {
        ApiError::internal(err, context)
    }
}

async fn create_role(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RolePayload>,
) -> Result<(StatusCode, Json<RoleCreated>), ApiError> {
    let role_name = payload
        .trimmed_name()
        .ok_or_else(|| ApiError::BadRequest("role_name required".to_string()))?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let role_id = repositories::roles::create(&mut *tx, role_name)
        .await
        .map_err(|e| duplicate_or_internal(e, "Failed to create role"))?;
    activity::record(&mut tx, admin.user_id, "create_role", Some(format!("role {role_name}")))
        .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(RoleCreated { message: "created", role_id })))
}

async fn update_role(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(role_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<RolePayload>,
) -> Result<Json<Value>, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let role = repositories::roles::find_by_id(&mut *tx, role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load role"))?
        .ok_or_else(|| ApiError::NotFound("role not found".to_string()))?;

    // A blank name leaves the role as it is.
    if let Some(role_name) = payload.trimmed_name() {
        repositories::roles::rename(&mut *tx, role.role_id, role_name)
            .await
            .map_err(|e| duplicate_or_internal(e, "Failed to rename role"))?;
        activity::record(
            &mut tx,
            admin.user_id,
            "update_role",
            Some(format!("role {} renamed to {role_name}", role.role_id)),
        )
        .await?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
    Ok(Json(json!({ "message": "updated" })))
}

async fn delete_role(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(role_id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let role = repositories::roles::find_by_id(&mut *tx, role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load role"))?
        .ok_or_else(|| ApiError::NotFound("role not found".to_string()))?;

    if UserRole::is_builtin(role.role_id) {
        return Err(ApiError::Conflict("built-in roles cannot be deleted".to_string()));
    }

    let in_use = repositories::users::count_by_role_id(&mut *tx, role.role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count role users"))?;
    if in_use > 0 {
        return Err(ApiError::Conflict("role is assigned to users".to_string()));
    }

    repositories::roles::delete(&mut *tx, role.role_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete role"))?;
    let details = format!("role {}", role.role_name);
    activity::record(&mut tx, admin.user_id, "delete_role", Some(details)).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(json!({ "message": "deleted" })))
}

#[cfg(test)]
mod tests;
