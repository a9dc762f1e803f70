use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::CurrentTeacher;
use crate::api::pagination::PageParams;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::{self, reports::ReportFilter};
use crate::schemas::dashboard::{PersonalReport, QuizStatusCounts, TeacherDashboard};
use crate::schemas::quiz::QuizResultResponse;
use crate::schemas::user::StudentResponse;
use crate::services::quiz_window;

use super::{load_report, RECENT_LIMIT};

pub(super) async fn dashboard(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TeacherDashboard>, ApiError> {
    let db = state.db();

    let profile = repositories::teachers::find_by_user_id(db, teacher.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load teacher"))?;
    let subject = match profile.and_then(|profile| profile.subject_id) {
        Some(subject_id) => repositories::subjects::find_by_id(db, subject_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load subject"))?,
        None => None,
    };

    let windows = repositories::quizzes::list_windows_by_creator(db, teacher.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quizzes"))?;
    let counts = quiz_window::count_statuses(&windows, primitive_now_utc());

    let students_with_results =
        repositories::quiz_results::count_distinct_students_by_creator(db, teacher.user_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
    let recent =
        repositories::quiz_results::list_recent_by_creator(db, teacher.user_id, RECENT_LIMIT)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    Ok(Json(TeacherDashboard {
        subject,
        quizzes: QuizStatusCounts {
            total: windows.len() as i64,
            upcoming: counts.upcoming,
            live: counts.live,
            finished: counts.finished,
        },
        students_with_results,
        recent_results: recent.into_iter().map(QuizResultResponse::from).collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct StudentsQuery {
    #[serde(default, alias = "classId")]
    class_id: Option<String>,
}

impl StudentsQuery {
    fn class_id(&self) -> Option<i64> {
        self.class_id.as_deref().and_then(|value| value.trim().parse().ok())
    }
}

pub(super) async fn students(
    CurrentTeacher(_teacher): CurrentTeacher,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StudentsQuery>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let rows = repositories::students::list_active(state.db(), query.class_id())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    Ok(Json(rows.into_iter().map(StudentResponse::from).collect()))
}

/// Quiz results on the teacher's quizzes and the test results they recorded.
pub(super) async fn report(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<PersonalReport>, ApiError> {
    let filter = ReportFilter { owner_id: Some(teacher.user_id), ..ReportFilter::default() };
    let (stats, results) = load_report(&state, &filter, &params).await?;
    Ok(Json(PersonalReport { stats, results }))
}
