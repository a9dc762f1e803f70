use sqlx::PgExecutor;

use crate::db::models::QuizQuestion;

const COLUMNS: &str = "\
    question_id, quiz_id, position, question_text, option_a, option_b, option_c, option_d, \
    correct_option";

pub(crate) struct NewQuestion<'a> {
    pub(crate) position: i32,
    pub(crate) question_text: &'a str,
    pub(crate) option_a: &'a str,
    pub(crate) option_b: &'a str,
    pub(crate) option_c: Option<&'a str>,
    pub(crate) option_d: Option<&'a str>,
    pub(crate) correct_option: &'a str,
}

pub(crate) async fn insert(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
    question: NewQuestion<'_>,
) -> Result<QuizQuestion, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "INSERT INTO quiz_questions (
            quiz_id, position, question_text, option_a, option_b, option_c, option_d,
            correct_option
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}"
    ))
    .bind(quiz_id)
    .bind(question.position)
    .bind(question.question_text)
    .bind(question.option_a)
    .bind(question.option_b)
    .bind(question.option_c)
    .bind(question.option_d)
    .bind(question.correct_option)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_quiz(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<Vec<QuizQuestion>, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {COLUMNS} FROM quiz_questions WHERE quiz_id = $1 ORDER BY position, question_id"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn delete_by_quiz(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
