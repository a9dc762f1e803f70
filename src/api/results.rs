use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::activity;
use crate::api::dashboards::load_report;
use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::guards::CurrentStaff;
use crate::api::pagination::PageParams;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::{self, reports::ReportFilter};
use crate::schemas::dashboard::ClassResults;
use crate::schemas::quiz::{non_blank, TestResultCreate, TestResultResponse};
use crate::services::grading;

/// Mounted at `/results`.
pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:grade/:class_name", get(class_results))
}

/// Merged into the teacher area.
pub(crate) fn teacher_router() -> Router<AppState> {
    Router::new().route("/test-results", post(record_test_result))
}

async fn class_results(
    CurrentStaff(_user): CurrentStaff,
    State(state): State<AppState>,
    ApiPath((grade, class_name)): ApiPath<(String, String)>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<ClassResults>, ApiError> {
    let class = repositories::classes::find_by_grade_and_name(state.db(), &grade, &class_name)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class"))?
        .ok_or_else(|| ApiError::NotFound("class not found".to_string()))?;

    let filter = ReportFilter {
        grade_level: Some(class.grade_level.clone()),
        class_name: Some(class.class_name.clone()),
        ..ReportFilter::default()
    };
    let (stats, results) = load_report(&state, &filter, &params).await?;

    Ok(Json(ClassResults { class, stats, results }))
}

async fn record_test_result(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TestResultCreate>,
) -> Result<(StatusCode, Json<TestResultResponse>), ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    if payload.score > payload.max_score {
        return Err(ApiError::BadRequest("score must not exceed max_score".to_string()));
    }

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    repositories::students::find_by_id(&mut *tx, payload.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Student {} does not exist.", payload.student_id))
        })?;
    repositories::subjects::find_by_id(&mut *tx, payload.subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Subject {} does not exist.", payload.subject_id))
        })?;

    let percentage = grading::percentage(payload.score, payload.max_score);
    let result = repositories::test_results::create(
        &mut *tx,
        repositories::test_results::NewTestResult {
            student_id: payload.student_id,
            subject_id: payload.subject_id,
            test_name: payload.test_name.trim(),
            score: payload.score,
            max_score: payload.max_score,
            percentage,
            grade: grading::letter_grade(percentage),
            term: non_blank(payload.term.as_deref()),
            remarks: non_blank(payload.remarks.as_deref()),
            test_date: payload.test_date,
            recorded_by: user.user_id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save test result"))?;
    activity::record(
        &mut tx,
        user.user_id,
        "record_test_result",
        Some(format!("{} for student {}", result.test_name, result.student_id)),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(TestResultResponse::from(result))))
}
