use std::collections::HashSet;

use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::CurrentStudent;
use crate::api::pagination::{PageParams, Paginated};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::{
    self,
    reports::{ReportFilter, ReportSummary},
};
use crate::schemas::dashboard::{PersonalReport, ReportStats, StudentDashboard};
use crate::schemas::quiz::{QuizResultResponse, QuizSummaryResponse, StudentQuizResponse};
use crate::services::quiz_window;

use super::{load_report, RECENT_LIMIT};

pub(super) async fn dashboard(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentDashboard>, ApiError> {
    let db = state.db();

    let Some(student) = repositories::students::find_by_user_id(db, user.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
    else {
        // Self-registered accounts have no class until an admin assigns one.
        return Ok(Json(StudentDashboard {
            class: None,
            quizzes: Vec::new(),
            recent_results: Vec::new(),
            average_percentage: None,
        }));
    };

    let (class, quizzes) = match student.class_id {
        Some(class_id) => {
            let class = repositories::classes::find_by_id(db, class_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load class"))?;
            let quizzes = repositories::quizzes::list_active_for_class(db, class_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;
            (class, quizzes)
        }
        None => (None, Vec::new()),
    };

    let submitted: HashSet<i64> =
        repositories::quiz_results::submitted_quiz_ids(db, student.student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load submissions"))?
            .into_iter()
            .collect();
    let recent =
        repositories::quiz_results::list_recent_by_student(db, student.student_id, RECENT_LIMIT)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list results"))?;
    let average = repositories::quiz_results::average_for_student(db, student.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to average results"))?;

    let now = primitive_now_utc();
    let quizzes = quizzes
        .into_iter()
        .map(|row| {
            let status = quiz_window::status(row.start_time, row.end_time, now);
            StudentQuizResponse {
                submitted: submitted.contains(&row.quiz_id),
                quiz: QuizSummaryResponse::from_row(row, status),
            }
        })
        .collect();

    Ok(Json(StudentDashboard {
        class,
        quizzes,
        recent_results: recent.into_iter().map(QuizResultResponse::from).collect(),
        average_percentage: average.map(|value| (value * 100.0).round() / 100.0),
    }))
}

pub(super) async fn report(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<PersonalReport>, ApiError> {
    let student = repositories::students::find_by_user_id(state.db(), user.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?;

    let Some(student) = student else {
        return Ok(Json(PersonalReport {
            stats: ReportStats::from(ReportSummary::default()),
            results: Paginated::new(Vec::new(), &params, 0),
        }));
    };

    let filter = ReportFilter { student_id: Some(student.student_id), ..ReportFilter::default() };
    let (stats, results) = load_report(&state, &filter, &params).await?;
    Ok(Json(PersonalReport { stats, results }))
}
