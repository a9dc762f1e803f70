use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgExecutor, Postgres};
use time::Date;

/// Test results and quiz results flattened into one shape. Quiz rows use the
/// submission date, the number of questions as `max_score`, and the quiz
/// creator as `owner_id`.
const RESULTS_SOURCE: &str = "\
    SELECT s.student_id, COALESCE(NULLIF(u.full_name, ''), u.username) AS student_name, \
           c.class_name, c.grade_level, c.academic_year, sub.subject_name, \
           tr.test_name AS assessment, 'test' AS source, tr.test_date AS taken_on, \
           tr.score, tr.max_score, tr.percentage, tr.grade, tr.term, tr.remarks, \
           tr.recorded_by AS owner_id \
    FROM test_results tr \
    JOIN students s ON s.student_id = tr.student_id \
    JOIN users u ON u.user_id = s.users_user_id \
    LEFT JOIN classes c ON c.class_id = s.class_id \
    JOIN subjects sub ON sub.subject_id = tr.subject_id \
    UNION ALL \
    SELECT s.student_id, COALESCE(NULLIF(u.full_name, ''), u.username) AS student_name, \
           c.class_name, c.grade_level, c.academic_year, sub.subject_name, \
           q.title AS assessment, 'quiz' AS source, CAST(qr.submitted_at AS DATE) AS taken_on, \
           CAST(qr.score AS DOUBLE PRECISION), CAST(qr.total_questions AS DOUBLE PRECISION), \
           qr.percentage, qr.grade, CAST(NULL AS VARCHAR) AS term, CAST(NULL AS TEXT) AS remarks, \
           q.created_by AS owner_id \
    FROM quiz_results qr \
    JOIN quizzes q ON q.quiz_id = qr.quiz_id \
    JOIN students s ON s.student_id = qr.student_id \
    JOIN users u ON u.user_id = s.users_user_id \
    LEFT JOIN classes c ON c.class_id = s.class_id \
    JOIN subjects sub ON sub.subject_id = q.subject_id";

const FILTER: &str = "\
    WHERE ($1::TEXT IS NULL OR r.grade_level = $1) \
      AND ($2::TEXT IS NULL OR r.class_name = $2) \
      AND ($3::TEXT IS NULL OR r.subject_name = $3) \
      AND ($4::TEXT IS NULL OR r.academic_year = $4) \
      AND ($5::TEXT IS NULL OR r.term = $5) \
      AND ($6::BIGINT IS NULL OR r.owner_id = $6) \
      AND ($7::BIGINT IS NULL OR r.student_id = $7)";

/// Every field narrows the result set when present.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReportFilter {
    pub(crate) grade_level: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) academic_year: Option<String>,
    pub(crate) term: Option<String>,
    pub(crate) owner_id: Option<i64>,
    pub(crate) student_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ReportRow {
    pub(crate) student_id: i64,
    pub(crate) student_name: String,
    pub(crate) class_name: Option<String>,
    pub(crate) grade_level: Option<String>,
    pub(crate) subject_name: String,
    pub(crate) assessment: String,
    pub(crate) source: String,
    pub(crate) taken_on: Date,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: f64,
    pub(crate) grade: String,
    pub(crate) term: Option<String>,
    pub(crate) remarks: Option<String>,
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub(crate) struct ReportSummary {
    pub(crate) total_results: i64,
    pub(crate) total_students: i64,
    pub(crate) average_percentage: Option<f64>,
    pub(crate) passed: i64,
    pub(crate) top_performers: i64,
    pub(crate) need_support: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LabelCount {
    pub(crate) label: String,
    pub(crate) count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LabelAverage {
    pub(crate) label: String,
    pub(crate) average: f64,
}

fn bind_filter<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    filter: &'q ReportFilter,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(filter.grade_level.as_deref())
        .bind(filter.class_name.as_deref())
        .bind(filter.subject_name.as_deref())
        .bind(filter.academic_year.as_deref())
        .bind(filter.term.as_deref())
        .bind(filter.owner_id)
        .bind(filter.student_id)
}

pub(crate) async fn list_page(
    executor: impl PgExecutor<'_>,
    filter: &ReportFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReportRow>, sqlx::Error> {
    let sql = format!(
        "SELECT r.student_id, r.student_name, r.class_name, r.grade_level, r.subject_name,
                r.assessment, r.source, r.taken_on, r.score, r.max_score, r.percentage,
                r.grade, r.term, r.remarks
         FROM ({RESULTS_SOURCE}) r
         {FILTER}
         ORDER BY r.taken_on DESC, r.student_id, r.assessment
         LIMIT $8 OFFSET $9"
    );

    bind_filter(sqlx::query_as::<_, ReportRow>(&sql), filter)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
}

/// Pass is at least 60%, top performers at least 90%; student counts are distinct.
pub(crate) async fn summary(
    executor: impl PgExecutor<'_>,
    filter: &ReportFilter,
) -> Result<ReportSummary, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*) AS total_results,
                COUNT(DISTINCT r.student_id) AS total_students,
                AVG(r.percentage) AS average_percentage,
                COUNT(*) FILTER (WHERE r.percentage >= 60) AS passed,
                COUNT(DISTINCT r.student_id) FILTER (WHERE r.percentage >= 90) AS top_performers,
                COUNT(DISTINCT r.student_id) FILTER (WHERE r.percentage < 60) AS need_support
         FROM ({RESULTS_SOURCE}) r
         {FILTER}"
    );

    bind_filter(sqlx::query_as::<_, ReportSummary>(&sql), filter).fetch_one(executor).await
}

pub(crate) async fn students_per_active_class(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        "SELECT c.class_name AS label, COUNT(s.student_id) AS count
         FROM classes c
         LEFT JOIN students s ON s.class_id = c.class_id
         WHERE c.is_active
         GROUP BY c.class_id, c.class_name, c.grade_level
         ORDER BY c.grade_level, c.class_name",
    )
    .fetch_all(executor)
    .await
}

pub(crate) async fn average_quiz_percentage_by_subject(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<LabelAverage>, sqlx::Error> {
    sqlx::query_as::<_, LabelAverage>(
        "SELECT sub.subject_name AS label, AVG(qr.percentage) AS average
         FROM quiz_results qr
         JOIN quizzes q ON q.quiz_id = qr.quiz_id
         JOIN subjects sub ON sub.subject_id = q.subject_id
         GROUP BY sub.subject_id, sub.subject_name
         ORDER BY sub.subject_name",
    )
    .fetch_all(executor)
    .await
}

pub(crate) async fn grade_distribution(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        "SELECT g.grade AS label, COUNT(*) AS count
         FROM (
            SELECT grade FROM quiz_results
            UNION ALL
            SELECT grade FROM test_results
         ) g
         GROUP BY g.grade
         ORDER BY g.grade",
    )
    .fetch_all(executor)
    .await
}

pub(crate) async fn monthly_signups(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        "SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS label, COUNT(*) AS count
         FROM users
         GROUP BY 1
         ORDER BY 1",
    )
    .fetch_all(executor)
    .await
}
