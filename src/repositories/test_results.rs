use sqlx::PgExecutor;
use time::{Date, PrimitiveDateTime};

use crate::db::models::TestResult;

const COLUMNS: &str = "\
    test_result_id, student_id, subject_id, test_name, score, max_score, percentage, grade, \
    term, remarks, test_date, recorded_by, created_at";

pub(crate) struct NewTestResult<'a> {
    pub(crate) student_id: i64,
    pub(crate) subject_id: i64,
    pub(crate) test_name: &'a str,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: f64,
    pub(crate) grade: &'a str,
    pub(crate) term: Option<&'a str>,
    pub(crate) remarks: Option<&'a str>,
    pub(crate) test_date: Date,
    pub(crate) recorded_by: i64,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: NewTestResult<'_>,
) -> Result<TestResult, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "INSERT INTO test_results (
            student_id, subject_id, test_name, score, max_score, percentage, grade, term,
            remarks, test_date, recorded_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {COLUMNS}"
    ))
    .bind(params.student_id)
    .bind(params.subject_id)
    .bind(params.test_name)
    .bind(params.score)
    .bind(params.max_score)
    .bind(params.percentage)
    .bind(params.grade)
    .bind(params.term)
    .bind(params.remarks)
    .bind(params.test_date)
    .bind(params.recorded_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn count(executor: impl PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM test_results").fetch_one(executor).await
}
