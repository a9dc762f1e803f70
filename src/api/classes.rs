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
use crate::db::models::Class;
use crate::repositories;
use crate::schemas::class::ClassPayload;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class))
        .route("/available", get(available_classes))
        .route("/:class_id", get(get_class).put(update_class).patch(update_class))
        .route("/:class_id/activate", post(activate_class))
        .route("/:class_id/deactivate", post(deactivate_class))
}

fn class_not_found() -> ApiError {
    ApiError::NotFound("class not found".to_string())
}

async fn list_classes(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<ActiveFilter>,
) -> Result<Json<Paginated<Class>>, ApiError> {
    let active = filter.value();
    let total = repositories::classes::count(state.db(), active)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count classes"))?;
    let classes =
        repositories::classes::list_page(state.db(), active, params.limit(), params.offset())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;

    Ok(Json(Paginated::new(classes, &params, total)))
}

async fn available_classes(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Class>>, ApiError> {
    let classes = repositories::classes::list_available(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list available classes"))?;
    Ok(Json(classes))
}

async fn get_class(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(class_id): ApiPath<i64>,
) -> Result<Json<Class>, ApiError> {
    repositories::classes::find_by_id(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class"))?
        .map(Json)
        .ok_or_else(class_not_found)
}

async fn create_class(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ClassPayload>,
) -> Result<(StatusCode, Json<Class>), ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    let fields = payload.checked().map_err(ApiError::BadRequest)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let class = repositories::classes::create(
        &mut *tx,
        repositories::classes::ClassFields {
            class_name: fields.class_name,
            grade_level: fields.grade_level,
            academic_year: fields.academic_year,
            max_students: fields.max_students,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create class"))?;
    activity::record(
        &mut tx,
        admin.user_id,
        "create_class",
        Some(format!("class {} ({})", class.class_name, class.class_id)),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(class_id = class.class_id, action = "create_class", "Class created");
    Ok((StatusCode::CREATED, Json(class)))
}

async fn update_class(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(class_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ClassPayload>,
) -> Result<Json<Class>, ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    let fields = payload.checked().map_err(ApiError::BadRequest)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let class = repositories::classes::update(
        &mut *tx,
        class_id,
        repositories::classes::ClassFields {
            class_name: fields.class_name,
            grade_level: fields.grade_level,
            academic_year: fields.academic_year,
            max_students: fields.max_students,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update class"))?
    .ok_or_else(class_not_found)?;
    activity::record(&mut tx, admin.user_id, "update_class", Some(format!("class {class_id}")))
        .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(class))
}

async fn set_class_active(
    state: &AppState,
    admin_id: i64,
    class_id: i64,
    is_active: bool,
) -> Result<Json<Class>, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let class = repositories::classes::set_active(&mut *tx, class_id, is_active)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update class status"))?
        .ok_or_else(class_not_found)?;
    let action = if is_active { "activate_class" } else { "deactivate_class" };
    activity::record(&mut tx, admin_id, action, Some(format!("class {class_id}"))).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(class))
}

async fn activate_class(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(class_id): ApiPath<i64>,
) -> Result<Json<Class>, ApiError> {
    set_class_active(&state, admin.user_id, class_id, true).await
}

async fn deactivate_class(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(class_id): ApiPath<i64>,
) -> Result<Json<Class>, ApiError> {
    set_class_active(&state, admin.user_id, class_id, false).await
}
