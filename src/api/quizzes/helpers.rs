use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::api::errors::ApiError;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::quiz::{
    QuestionInput, QuestionResponse, QuizDetailResponse, QuizSummaryResponse,
};
use crate::services::quiz_window;

pub(super) fn quiz_not_found() -> ApiError {
    ApiError::NotFound("Quiz not found.".to_string())
}

/// Loads a quiz the caller may manage: its creator, or any admin.
pub(super) async fn load_managed_quiz(
    conn: &mut PgConnection,
    user: &User,
    quiz_id: i64,
) -> Result<Quiz, ApiError> {
    let quiz = repositories::quizzes::find_by_id(&mut *conn, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(quiz_not_found)?;

    if quiz.created_by != user.user_id && user.role() != Some(UserRole::Admin) {
        return Err(ApiError::Forbidden("You can only manage your own quizzes"));
    }

    Ok(quiz)
}

pub(super) fn ensure_window(
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::BadRequest("end_time must be after start_time".to_string()));
    }
    Ok(())
}

/// Correct letters in question order; the first invalid question is reported by number.
pub(super) fn correct_letters(questions: &[QuestionInput]) -> Result<Vec<String>, ApiError> {
    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            question.correct_letter().map_err(|message| {
                ApiError::BadRequest(format!("Question {}: {message}", index + 1))
            })
        })
        .collect()
}

pub(super) async fn ensure_class_and_subject(
    conn: &mut PgConnection,
    class_id: i64,
    subject_id: i64,
) -> Result<(), ApiError> {
    repositories::classes::find_by_id(&mut *conn, class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class"))?
        .ok_or_else(|| ApiError::BadRequest(format!("Class {class_id} does not exist.")))?;
    repositories::subjects::find_by_id(&mut *conn, subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .ok_or_else(|| ApiError::BadRequest(format!("Subject {subject_id} does not exist.")))?;
    Ok(())
}

pub(super) async fn insert_questions(
    conn: &mut PgConnection,
    quiz_id: i64,
    questions: &[QuestionInput],
    letters: &[String],
) -> Result<(), ApiError> {
    for (index, (question, letter)) in questions.iter().zip(letters).enumerate() {
        repositories::questions::insert(
            &mut *conn,
            quiz_id,
            repositories::questions::NewQuestion {
                position: index as i32 + 1,
                question_text: question.question_text.trim(),
                option_a: question.option_a.trim(),
                option_b: question.option_b.trim(),
                option_c: question.option_c(),
                option_d: question.option_d(),
                correct_option: letter,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save question"))?;
    }
    Ok(())
}

/// Quiz summary with its questions; answers are included for quiz managers only.
pub(super) async fn quiz_detail(
    conn: &mut PgConnection,
    quiz_id: i64,
    with_answers: bool,
) -> Result<QuizDetailResponse, ApiError> {
    let summary = repositories::quizzes::find_summary(&mut *conn, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(quiz_not_found)?;
    let questions = repositories::questions::list_by_quiz(&mut *conn, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    let status = quiz_window::status(summary.start_time, summary.end_time, primitive_now_utc());
    let questions = questions
        .into_iter()
        .map(|question| {
            if with_answers {
                QuestionResponse::with_answer(question)
            } else {
                QuestionResponse::without_answer(question)
            }
        })
        .collect();

    Ok(QuizDetailResponse { quiz: QuizSummaryResponse::from_row(summary, status), questions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn question(correct: &str) -> QuestionInput {
        QuestionInput {
            question_text: "Capital of Cambodia".to_string(),
            option_a: "Phnom Penh".to_string(),
            option_b: "Siem Reap".to_string(),
            option_c: None,
            option_d: None,
            correct_option: correct.to_string(),
        }
    }

    #[test]
    fn end_must_follow_start() {
        let start = datetime!(2025-03-01 09:00);
        assert!(ensure_window(start, datetime!(2025-03-01 09:30)).is_ok());
        assert!(ensure_window(start, start).is_err());
    }

    #[test]
    fn letters_are_reported_with_question_number() {
        assert_eq!(correct_letters(&[question("a"), question("B")]).unwrap(), vec!["A", "B"]);

        match correct_letters(&[question("A"), question("C")]) {
            Err(ApiError::BadRequest(message)) => assert!(message.starts_with("Question 2:")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
