use serde::Serialize;

use crate::api::pagination::Paginated;
use crate::core::time::format_date;
use crate::db::models::{Class, Subject};
use crate::repositories::reports::{LabelAverage, LabelCount, ReportRow, ReportSummary};
use crate::schemas::quiz::{QuizResultResponse, StudentQuizResponse};
use crate::schemas::user::ActivityResponse;
use crate::services::grading;

#[derive(Debug, Serialize)]
pub(crate) struct DashboardTotals {
    pub(crate) students: i64,
    pub(crate) teachers: i64,
    pub(crate) classes: i64,
    pub(crate) subjects: i64,
    pub(crate) quizzes: i64,
    pub(crate) results: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminDashboard {
    pub(crate) totals: DashboardTotals,
    pub(crate) recent_activity: Vec<ActivityResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChartSeries<T> {
    pub(crate) labels: Vec<String>,
    pub(crate) values: Vec<T>,
}

impl From<Vec<LabelCount>> for ChartSeries<i64> {
    fn from(rows: Vec<LabelCount>) -> Self {
        let (labels, values) = rows.into_iter().map(|row| (row.label, row.count)).unzip();
        Self { labels, values }
    }
}

impl From<Vec<LabelAverage>> for ChartSeries<f64> {
    fn from(rows: Vec<LabelAverage>) -> Self {
        let (labels, values) =
            rows.into_iter().map(|row| (row.label, round2(row.average))).unzip();
        Self { labels, values }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminCharts {
    pub(crate) students_per_class: ChartSeries<i64>,
    pub(crate) average_by_subject: ChartSeries<f64>,
    pub(crate) grade_distribution: ChartSeries<i64>,
    pub(crate) monthly_signups: ChartSeries<i64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct ReportStats {
    pub(crate) total_results: i64,
    pub(crate) total_students: i64,
    pub(crate) pass_rate: f64,
    pub(crate) average_score: f64,
    pub(crate) top_performers: i64,
    pub(crate) need_support: i64,
}

impl From<ReportSummary> for ReportStats {
    fn from(summary: ReportSummary) -> Self {
        let pass_rate = if summary.total_results > 0 {
            round2(summary.passed as f64 / summary.total_results as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            total_results: summary.total_results,
            total_students: summary.total_students,
            pass_rate,
            average_score: summary.average_percentage.map(round2).unwrap_or(0.0),
            top_performers: summary.top_performers,
            need_support: summary.need_support,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportRowResponse {
    pub(crate) student_code: String,
    pub(crate) student_id: i64,
    pub(crate) student_name: String,
    pub(crate) class_name: Option<String>,
    pub(crate) grade_level: Option<String>,
    pub(crate) subject_name: String,
    pub(crate) assessment: String,
    pub(crate) source: String,
    pub(crate) date: String,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: f64,
    pub(crate) grade: String,
    pub(crate) status: &'static str,
    pub(crate) term: Option<String>,
    pub(crate) remarks: Option<String>,
}

impl From<ReportRow> for ReportRowResponse {
    fn from(row: ReportRow) -> Self {
        Self {
            student_code: student_code(row.student_id),
            status: grading::status_label(row.percentage),
            student_id: row.student_id,
            student_name: row.student_name,
            class_name: row.class_name,
            grade_level: row.grade_level,
            subject_name: row.subject_name,
            assessment: row.assessment,
            source: row.source,
            date: format_date(row.taken_on),
            score: row.score,
            max_score: row.max_score,
            percentage: row.percentage,
            grade: row.grade,
            term: row.term,
            remarks: row.remarks,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportFilterOptions {
    pub(crate) classes: Vec<Class>,
    pub(crate) subjects: Vec<Subject>,
    pub(crate) grade_levels: Vec<String>,
    pub(crate) academic_years: Vec<String>,
}

#[derive(Debug, Serialize, Default)]
pub(crate) struct AppliedFilters {
    pub(crate) grade: Option<String>,
    pub(crate) class: Option<String>,
    pub(crate) subject: Option<String>,
    pub(crate) year: Option<String>,
    pub(crate) term: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminReport {
    pub(crate) filters: AppliedFilters,
    pub(crate) options: ReportFilterOptions,
    pub(crate) stats: ReportStats,
    pub(crate) results: Paginated<ReportRowResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PersonalReport {
    pub(crate) stats: ReportStats,
    pub(crate) results: Paginated<ReportRowResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResults {
    pub(crate) class: Class,
    pub(crate) stats: ReportStats,
    pub(crate) results: Paginated<ReportRowResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizStatusCounts {
    pub(crate) total: i64,
    pub(crate) upcoming: i64,
    pub(crate) live: i64,
    pub(crate) finished: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherDashboard {
    pub(crate) subject: Option<Subject>,
    pub(crate) quizzes: QuizStatusCounts,
    pub(crate) students_with_results: i64,
    pub(crate) recent_results: Vec<QuizResultResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboard {
    pub(crate) class: Option<Class>,
    pub(crate) quizzes: Vec<StudentQuizResponse>,
    pub(crate) recent_results: Vec<QuizResultResponse>,
    pub(crate) average_percentage: Option<f64>,
}

/// `#STU001` style code shown on report cards.
pub(crate) fn student_code(student_id: i64) -> String {
    format!("#STU{student_id:03}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
