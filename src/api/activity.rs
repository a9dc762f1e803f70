use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use sqlx::PgConnection;

use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{PageParams, Paginated};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::ActivityResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/activity", get(list_activity))
}

/// Appends an audit entry on the caller's transaction so it commits with the change.
pub(crate) async fn record(
    conn: &mut PgConnection,
    user_id: i64,
    action: &str,
    details: Option<String>,
) -> Result<(), ApiError> {
    repositories::activity_logs::record(
        conn,
        Some(user_id),
        action,
        details.as_deref(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record activity"))
}

async fn list_activity(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Paginated<ActivityResponse>>, ApiError> {
    let total = repositories::activity_logs::count(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count activity"))?;
    let rows = repositories::activity_logs::list_page(state.db(), params.limit(), params.offset())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list activity"))?;

    Ok(Json(Paginated::new(rows, &params, total).map(ActivityResponse::from)))
}
