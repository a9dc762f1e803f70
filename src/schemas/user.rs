use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::pagination::Paginated;
use crate::core::time::format_primitive;
use crate::db::models::{Class, Subject, User};
use crate::repositories::activity_logs::ActivityRow;
use crate::repositories::students::StudentListRow;
use crate::repositories::teachers::TeacherListRow;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) role_id: i64,
    pub(crate) role: Option<&'static str>,
    pub(crate) is_active: bool,
    pub(crate) force_password_change: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            role: user.role().map(|role| role.as_str()),
            user_id: user.user_id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            gender: user.gender,
            role_id: user.role_id,
            is_active: user.is_active,
            force_password_change: user.force_password_change,
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) student_id: i64,
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) class_id: Option<i64>,
    pub(crate) class_name: Option<String>,
}

impl From<StudentListRow> for StudentResponse {
    fn from(row: StudentListRow) -> Self {
        Self {
            student_id: row.student_id,
            user_id: row.user_id,
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            gender: row.gender,
            is_active: row.is_active,
            class_id: row.class_id,
            class_name: row.class_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherResponse {
    pub(crate) teacher_id: i64,
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) subject_id: Option<i64>,
    pub(crate) subject_name: Option<String>,
}

impl From<TeacherListRow> for TeacherResponse {
    fn from(row: TeacherListRow) -> Self {
        Self {
            teacher_id: row.teacher_id,
            user_id: row.user_id,
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            gender: row.gender,
            is_active: row.is_active,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UsersOverview {
    pub(crate) students: Paginated<StudentResponse>,
    pub(crate) teachers: Paginated<TeacherResponse>,
    pub(crate) available_classes: Vec<Class>,
    pub(crate) active_subjects: Vec<Subject>,
    pub(crate) creds_available: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[serde(default)]
    pub(crate) entity: String,
    #[serde(default, alias = "fullName")]
    #[validate(length(max = 100, message = "full_name is too long"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "email is too long"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 30, message = "phone is too long"))]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "gender is too long"))]
    pub(crate) gender: Option<String>,
    #[serde(default, alias = "classId")]
    pub(crate) class_id: Option<i64>,
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserUpdate {
    #[serde(default, alias = "fullName")]
    #[validate(length(max = 100, message = "full_name is too long"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "email is too long"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 30, message = "phone is too long"))]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "gender is too long"))]
    pub(crate) gender: Option<String>,
    #[serde(default, alias = "classId")]
    pub(crate) class_id: Option<i64>,
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccountIssuedResponse {
    pub(crate) ok: bool,
    pub(crate) message: String,
    pub(crate) user: UserResponse,
    pub(crate) creds_available: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) ok: bool,
    pub(crate) message: String,
    pub(crate) imported: usize,
    pub(crate) creds_available: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToggleStatusResponse {
    pub(crate) ok: bool,
    pub(crate) user_id: i64,
    pub(crate) is_active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivityResponse {
    pub(crate) log_id: i64,
    pub(crate) user_id: Option<i64>,
    pub(crate) username: Option<String>,
    pub(crate) action: String,
    pub(crate) details: Option<String>,
    pub(crate) created_at: String,
}

impl From<ActivityRow> for ActivityResponse {
    fn from(row: ActivityRow) -> Self {
        Self {
            log_id: row.log_id,
            user_id: row.user_id,
            username: row.username,
            action: row.action,
            details: row.details,
            created_at: format_primitive(row.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn user_response_exposes_role_name_and_utc_timestamp() {
        let user = User {
            user_id: 7,
            username: "dara".to_string(),
            password: "hash".to_string(),
            full_name: Some("Dara Sok".to_string()),
            email: None,
            phone: None,
            gender: None,
            role_id: 2,
            is_active: true,
            force_password_change: false,
            created_at: datetime!(2025-03-04 07:08:09),
        };

        let response = UserResponse::from_db(user);
        assert_eq!(response.role, Some("teacher"));
        assert_eq!(response.created_at, "2025-03-04T07:08:09Z");
    }

    #[test]
    fn unknown_role_ids_serialize_without_a_role_name() {
        let user = User {
            user_id: 8,
            username: "custom".to_string(),
            password: "hash".to_string(),
            full_name: None,
            email: None,
            phone: None,
            gender: None,
            role_id: 9,
            is_active: true,
            force_password_change: false,
            created_at: datetime!(2025-03-04 07:08:09),
        };

        let json = serde_json::to_value(UserResponse::from_db(user)).expect("serialize");
        assert!(json["role"].is_null());
        assert_eq!(json["role_id"], 9);
    }
}
