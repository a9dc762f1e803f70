use std::collections::HashMap;

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::UserRole;

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Role {
    pub(crate) role_id: i64,
    pub(crate) role_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct User {
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) role_id: i64,
    pub(crate) is_active: bool,
    pub(crate) force_password_change: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn role(&self) -> Option<UserRole> {
        UserRole::from_id(self.role_id)
    }

    /// Full name when set, otherwise the username.
    pub(crate) fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Student {
    pub(crate) student_id: i64,
    pub(crate) class_id: Option<i64>,
    pub(crate) users_user_id: i64,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Teacher {
    pub(crate) teacher_id: i64,
    pub(crate) subject_id: Option<i64>,
    pub(crate) users_user_id: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Class {
    pub(crate) class_id: i64,
    pub(crate) class_name: String,
    pub(crate) grade_level: String,
    pub(crate) academic_year: String,
    pub(crate) max_students: Option<i32>,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) subject_id: i64,
    pub(crate) subject_name: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Quiz {
    pub(crate) quiz_id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) class_id: i64,
    pub(crate) subject_id: i64,
    pub(crate) created_by: i64,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizQuestion {
    pub(crate) question_id: i64,
    pub(crate) quiz_id: i64,
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) option_a: String,
    pub(crate) option_b: String,
    pub(crate) option_c: Option<String>,
    pub(crate) option_d: Option<String>,
    pub(crate) correct_option: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizResult {
    pub(crate) result_id: i64,
    pub(crate) quiz_id: i64,
    pub(crate) student_id: i64,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: String,
    pub(crate) answers: Json<HashMap<String, String>>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct TestResult {
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
    pub(crate) test_date: Date,
    pub(crate) recorded_by: i64,
    pub(crate) created_at: PrimitiveDateTime,
}
