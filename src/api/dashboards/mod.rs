mod admin;
mod student;
mod teacher;

use axum::{routing::get, Router};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::pagination::{PageParams, Paginated};
use crate::core::state::AppState;
use crate::repositories::{self, reports::ReportFilter};
use crate::schemas::dashboard::{ReportRowResponse, ReportStats};

pub(crate) fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/dashboard/charts", get(admin::charts))
        .route("/report", get(admin::report))
}

pub(crate) fn teacher_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(teacher::dashboard))
        .route("/students", get(teacher::students))
        .route("/report", get(teacher::report))
}

pub(crate) fn student_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(student::dashboard))
        .route("/report", get(student::report))
}

pub(super) const RECENT_LIMIT: i64 = 10;

/// `?grade=&class=&subject=&year=&term=`; blank values do not filter.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ReportQuery {
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    term: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl ReportQuery {
    pub(super) fn filter(&self) -> ReportFilter {
        ReportFilter {
            grade_level: non_blank(&self.grade),
            class_name: non_blank(&self.class),
            subject_name: non_blank(&self.subject),
            academic_year: non_blank(&self.year),
            term: non_blank(&self.term),
            ..ReportFilter::default()
        }
    }
}

/// Stats over the whole filtered set plus one page of rows.
pub(crate) async fn load_report(
    state: &AppState,
    filter: &ReportFilter,
    params: &PageParams,
) -> Result<(ReportStats, Paginated<ReportRowResponse>), ApiError> {
    let summary = repositories::reports::summary(state.db(), filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to summarize results"))?;
    let rows = repositories::reports::list_page(state.db(), filter, params.limit(), params.offset())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    let total = summary.total_results;
    Ok((
        ReportStats::from(summary),
        Paginated::new(rows, params, total).map(ReportRowResponse::from),
    ))
}

#[cfg(test)]
mod tests;
