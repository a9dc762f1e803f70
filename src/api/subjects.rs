use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{ActiveFilter, PageParams, Paginated};
use crate::core::state::AppState;
use crate::db::models::Subject;
use crate::repositories;
use crate::schemas::subject::SubjectPayload;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route("/active", get(active_subjects))
        .route("/:subject_id", get(get_subject).put(update_subject).patch(update_subject))
        .route("/:subject_id/activate", post(activate_subject))
        .route("/:subject_id/deactivate", post(deactivate_subject))
}

fn subject_not_found() -> ApiError {
    ApiError::NotFound("subject not found".to_string())
}

fn required_name(payload: &SubjectPayload) -> Result<&str, ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    payload.name().ok_or_else(|| ApiError::BadRequest("subject_name is required".to_string()))
}

async fn list_subjects(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<ActiveFilter>,
) -> Result<Json<Paginated<Subject>>, ApiError> {
    let active = filter.value();
    let total = repositories::subjects::count(state.db(), active)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count subjects"))?;
    let subjects =
        repositories::subjects::list_page(state.db(), active, params.limit(), params.offset())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(Paginated::new(subjects, &params, total)))
}

async fn active_subjects(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Subject>>, ApiError> {
    let subjects = repositories::subjects::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list active subjects"))?;
    Ok(Json(subjects))
}

async fn get_subject(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
) -> Result<Json<Subject>, ApiError> {
    repositories::subjects::find_by_id(state.db(), subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .map(Json)
        .ok_or_else(subject_not_found)
}

async fn create_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SubjectPayload>,
) -> Result<(StatusCode, Json<Subject>), ApiError> {
    let subject_name = required_name(&payload)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let subject = repositories::subjects::create(&mut *tx, subject_name, payload.description())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create subject"))?;
    activity::record(
        &mut tx,
        admin.user_id,
        "create_subject",
        Some(format!("subject {} ({})", subject.subject_name, subject.subject_id)),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(subject)))
}

async fn update_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<SubjectPayload>,
) -> Result<Json<Subject>, ApiError> {
    let subject_name = required_name(&payload)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let subject =
        repositories::subjects::update(&mut *tx, subject_id, subject_name, payload.description())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update subject"))?
            .ok_or_else(subject_not_found)?;
    activity::record(
        &mut tx,
        admin.user_id,
        "update_subject",
        Some(format!("subject {subject_id}")),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(subject))
}

async fn set_subject_active(
    state: &AppState,
    admin_id: i64,
    subject_id: i64,
    is_active: bool,
) -> Result<Json<Subject>, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let subject = repositories::subjects::set_active(&mut *tx, subject_id, is_active)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update subject status"))?
        .ok_or_else(subject_not_found)?;
    let action = if is_active { "activate_subject" } else { "deactivate_subject" };
    activity::record(&mut tx, admin_id, action, Some(format!("subject {subject_id}"))).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(subject))
}

async fn activate_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
) -> Result<Json<Subject>, ApiError> {
    set_subject_active(&state, admin.user_id, subject_id, true).await
}

async fn deactivate_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
) -> Result<Json<Subject>, ApiError> {
    set_subject_active(&state, admin.user_id, subject_id, false).await
}

#[cfg(test)]
mod tests;
