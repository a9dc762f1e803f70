use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::{QuizQuestion, TestResult};
use crate::db::types::QuizStatus;
use crate::repositories::quiz_results::QuizResultRow;
use crate::repositories::quizzes::QuizSummaryRow;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionInput {
    #[serde(alias = "questionText", alias = "text")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "optionA")]
    #[validate(length(min = 1, message = "option_a must not be empty"))]
    pub(crate) option_a: String,
    #[serde(alias = "optionB")]
    #[validate(length(min = 1, message = "option_b must not be empty"))]
    pub(crate) option_b: String,
    #[serde(default, alias = "optionC")]
    pub(crate) option_c: Option<String>,
    #[serde(default, alias = "optionD")]
    pub(crate) option_d: Option<String>,
    #[serde(alias = "correctOption", alias = "correct_answer")]
    pub(crate) correct_option: String,
}

impl QuestionInput {
    pub(crate) fn option_c(&self) -> Option<&str> {
        non_blank(self.option_c.as_deref())
    }

    pub(crate) fn option_d(&self) -> Option<&str> {
        non_blank(self.option_d.as_deref())
    }

    /// Upper-cased letter of the correct option; it must name an option that was provided.
    pub(crate) fn correct_letter(&self) -> Result<String, String> {
        let letter = self.correct_option.trim().to_ascii_uppercase();
        let provided = match letter.as_str() {
            "A" | "B" => true,
            "C" => self.option_c().is_some(),
            "D" => self.option_d().is_some(),
            _ => false,
        };

        if provided {
            Ok(letter)
        } else {
            Err(format!(
                "correct_option '{}' must be one of the provided options",
                self.correct_option.trim()
            ))
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1..200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "classId")]
    pub(crate) class_id: i64,
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: i64,
    #[serde(alias = "startTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) end_time: OffsetDateTime,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[validate(length(min = 1, message = "a quiz needs at least one question"), nested)]
    pub(crate) questions: Vec<QuestionInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1..200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "classId")]
    pub(crate) class_id: Option<i64>,
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: Option<i64>,
    #[serde(
        default,
        alias = "startTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) start_time: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "endTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) end_time: Option<OffsetDateTime>,
    #[serde(default, alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
    /// When present, replaces every question of the quiz.
    #[serde(default)]
    #[validate(length(min = 1, message = "a quiz needs at least one question"), nested)]
    pub(crate) questions: Option<Vec<QuestionInput>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizSummaryResponse {
    pub(crate) quiz_id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) class_id: i64,
    pub(crate) class_name: String,
    pub(crate) subject_id: i64,
    pub(crate) subject_name: String,
    pub(crate) created_by: i64,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) duration_minutes: i32,
    pub(crate) is_active: bool,
    pub(crate) status: QuizStatus,
    pub(crate) question_count: i64,
    pub(crate) result_count: i64,
}

impl QuizSummaryResponse {
    pub(crate) fn from_row(row: QuizSummaryRow, status: QuizStatus) -> Self {
        Self {
            quiz_id: row.quiz_id,
            title: row.title,
            description: row.description,
            class_id: row.class_id,
            class_name: row.class_name,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            created_by: row.created_by,
            start_time: format_primitive(row.start_time),
            end_time: format_primitive(row.end_time),
            duration_minutes: row.duration_minutes,
            is_active: row.is_active,
            status,
            question_count: row.question_count,
            result_count: row.result_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) question_id: i64,
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) option_a: String,
    pub(crate) option_b: String,
    pub(crate) option_c: Option<String>,
    pub(crate) option_d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_option: Option<String>,
}

impl QuestionResponse {
    pub(crate) fn with_answer(question: QuizQuestion) -> Self {
        let correct = question.correct_option.clone();
        Self { correct_option: Some(correct), ..Self::without_answer(question) }
    }

    pub(crate) fn without_answer(question: QuizQuestion) -> Self {
        Self {
            question_id: question.question_id,
            position: question.position,
            question_text: question.question_text,
            option_a: question.option_a,
            option_b: question.option_b,
            option_c: question.option_c,
            option_d: question.option_d,
            correct_option: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizDetailResponse {
    pub(crate) quiz: QuizSummaryResponse,
    pub(crate) questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizToggleResponse {
    pub(crate) ok: bool,
    pub(crate) quiz_id: i64,
    pub(crate) is_active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuizResponse {
    pub(crate) quiz: QuizSummaryResponse,
    pub(crate) submitted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizSubmission {
    #[serde(default)]
    pub(crate) answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizSubmitResponse {
    pub(crate) ok: bool,
    pub(crate) message: &'static str,
    pub(crate) score: i32,
    pub(crate) total: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResultResponse {
    pub(crate) result_id: i64,
    pub(crate) quiz_id: i64,
    pub(crate) quiz_title: String,
    pub(crate) student_id: i64,
    pub(crate) student_name: String,
    pub(crate) class_name: Option<String>,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: String,
    pub(crate) submitted_at: String,
}

impl From<QuizResultRow> for QuizResultResponse {
    fn from(row: QuizResultRow) -> Self {
        Self {
            result_id: row.result_id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            student_id: row.student_id,
            student_name: row.student_name,
            class_name: row.class_name,
            score: row.score,
            total_questions: row.total_questions,
            percentage: row.percentage,
            grade: row.grade,
            submitted_at: format_primitive(row.submitted_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestResultCreate {
    #[serde(alias = "studentId")]
    pub(crate) student_id: i64,
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: i64,
    #[serde(alias = "testName")]
    #[validate(length(min = 1, max = 100, message = "test_name must be 1..100 characters"))]
    pub(crate) test_name: String,
    #[validate(range(min = 0.0, message = "score must be non-negative"))]
    pub(crate) score: f64,
    #[serde(alias = "maxScore")]
    #[validate(range(exclusive_min = 0.0, message = "max_score must be positive"))]
    pub(crate) max_score: f64,
    #[serde(alias = "testDate", deserialize_with = "deserialize_date")]
    pub(crate) test_date: Date,
    #[serde(default)]
    pub(crate) term: Option<String>,
    #[serde(default)]
    pub(crate) remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestResultResponse {
    pub(crate) test_result_id: i64,
    pub(crate) student_id: i64,
    pub(crate) subject_id: i64,
    pub(crate) test_name: String,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: f64,
    pub(crate) grade: String,
    pub(crate) term: Option<String>,
    pub(crate) remarks: Option<String>,
    pub(crate) test_date: String,
    pub(crate) recorded_by: i64,
}

impl From<TestResult> for TestResultResponse {
    fn from(result: TestResult) -> Self {
        Self {
            test_result_id: result.test_result_id,
            student_id: result.student_id,
            subject_id: result.subject_id,
            test_name: result.test_name,
            score: result.score,
            max_score: result.max_score,
            percentage: result.percentage,
            grade: result.grade,
            term: result.term,
            remarks: result.remarks,
            test_date: format_date(result.test_date),
            recorded_by: result.recorded_by,
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Browser datetime-local inputs omit the offset; those are read as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(raw.trim())
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(value.trim())
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Date::parse(raw.trim(), &format_description!("[year]-[month]-[day]"))
        .map_err(|_| D::Error::custom(format!("invalid date: {raw}")))
}
