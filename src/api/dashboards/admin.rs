use std::collections::BTreeSet;

use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PageParams;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::dashboard::{
    AdminCharts, AdminDashboard, AdminReport, AppliedFilters, DashboardTotals,
    ReportFilterOptions,
};
use crate::schemas::user::ActivityResponse;

use super::{load_report, ReportQuery, RECENT_LIMIT};

pub(super) async fn dashboard(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>, ApiError> {
    let db = state.db();

    let students = repositories::students::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
    let teachers = repositories::teachers::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count teachers"))?;
    let classes = repositories::classes::count(db, Some(true))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count classes"))?;
    let subjects = repositories::subjects::count(db, Some(true))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count subjects"))?;
    let quizzes = repositories::quizzes::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quizzes"))?;
    let quiz_results = repositories::quiz_results::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quiz results"))?;
    let test_results = repositories::test_results::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count test results"))?;
    let recent = repositories::activity_logs::list_page(db, RECENT_LIMIT, 0)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list activity"))?;

    Ok(Json(AdminDashboard {
        totals: DashboardTotals {
            students,
            teachers,
            classes,
            subjects,
            quizzes,
            results: quiz_results + test_results,
        },
        recent_activity: recent.into_iter().map(ActivityResponse::from).collect(),
    }))
}

pub(super) async fn charts(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminCharts>, ApiError> {
    let db = state.db();

    let students_per_class = repositories::reports::students_per_active_class(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class chart"))?;
    let average_by_subject = repositories::reports::average_quiz_percentage_by_subject(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject chart"))?;
    let grade_distribution = repositories::reports::grade_distribution(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grade chart"))?;
    let monthly_signups = repositories::reports::monthly_signups(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load sign-up chart"))?;

    Ok(Json(AdminCharts {
        students_per_class: students_per_class.into(),
        average_by_subject: average_by_subject.into(),
        grade_distribution: grade_distribution.into(),
        monthly_signups: monthly_signups.into(),
    }))
}

async fn filter_options(state: &AppState) -> Result<ReportFilterOptions, ApiError> {
    let classes = repositories::classes::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;
    let subjects = repositories::subjects::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    let grade_levels: BTreeSet<String> =
        classes.iter().map(|class| class.grade_level.clone()).collect();
    let academic_years: BTreeSet<String> =
        classes.iter().map(|class| class.academic_year.clone()).collect();

    Ok(ReportFilterOptions {
        grade_levels: grade_levels.into_iter().collect(),
        academic_years: academic_years.into_iter().collect(),
        classes,
        subjects,
    })
}

pub(super) async fn report(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<AdminReport>, ApiError> {
    let filter = query.filter();
    let (stats, results) = load_report(&state, &filter, &params).await?;
    let options = filter_options(&state).await?;

    Ok(Json(AdminReport {
        filters: AppliedFilters {
            grade: filter.grade_level,
            class: filter.class_name,
            subject: filter.subject_name,
            year: filter.academic_year,
            term: filter.term,
        },
        options,
        stats,
        results,
    }))
}
