use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassPayload {
    #[serde(default, alias = "className")]
    #[validate(length(max = 50, message = "class_name is too long"))]
    pub(crate) class_name: String,
    #[serde(default, alias = "gradeLevel")]
    #[validate(length(max = 20, message = "grade_level is too long"))]
    pub(crate) grade_level: String,
    #[serde(default, alias = "academicYear")]
    #[validate(length(max = 20, message = "academic_year is too long"))]
    pub(crate) academic_year: String,
    /// Number, numeric string, blank or null; blank and null mean unlimited.
    #[serde(default, alias = "maxStudents")]
    pub(crate) max_students: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValidClass<'a> {
    pub(crate) class_name: &'a str,
    pub(crate) grade_level: &'a str,
    pub(crate) academic_year: &'a str,
    pub(crate) max_students: Option<i32>,
}

impl ClassPayload {
    pub(crate) fn checked(&self) -> Result<ValidClass<'_>, String> {
        let class_name = self.class_name.trim();
        let grade_level = self.grade_level.trim();
        let academic_year = self.academic_year.trim();
        if class_name.is_empty() || grade_level.is_empty() || academic_year.is_empty() {
            return Err("class_name, grade_level and academic_year are required".to_string());
        }

        Ok(ValidClass {
            class_name,
            grade_level,
            academic_year,
            max_students: parse_capacity(&self.max_students)?,
        })
    }
}

fn parse_capacity(value: &serde_json::Value) -> Result<Option<i32>, String> {
    const INVALID: &str = "max_students must be a non-negative number";

    let parsed = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::String(raw) if raw.trim().is_empty() => return Ok(None),
        serde_json::Value::String(raw) => raw.trim().parse::<i64>().map_err(|_| INVALID)?,
        serde_json::Value::Number(number) => number.as_i64().ok_or(INVALID)?,
        _ => return Err(INVALID.to_string()),
    };

    if parsed < 0 {
        return Err(INVALID.to_string());
    }
    i32::try_from(parsed).map(Some).map_err(|_| INVALID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(max_students: serde_json::Value) -> ClassPayload {
        ClassPayload {
            class_name: " 7A ".to_string(),
            grade_level: "7".to_string(),
            academic_year: "2024-2025".to_string(),
            max_students,
        }
    }

    #[test]
    fn capacity_accepts_numbers_strings_and_blank() {
        assert_eq!(payload(json!(30)).checked().unwrap().max_students, Some(30));
        assert_eq!(payload(json!(" 25 ")).checked().unwrap().max_students, Some(25));
        assert_eq!(payload(json!("")).checked().unwrap().max_students, None);
        assert_eq!(payload(json!(null)).checked().unwrap().max_students, None);
        assert_eq!(payload(json!(0)).checked().unwrap().max_students, Some(0));
    }

    #[test]
    fn capacity_rejects_negative_and_non_numeric() {
        assert!(payload(json!(-1)).checked().is_err());
        assert!(payload(json!("ten")).checked().is_err());
        assert!(payload(json!(2.5)).checked().is_err());
        assert!(payload(json!(true)).checked().is_err());
    }

    #[test]
    fn names_are_trimmed_and_required() {
        let valid = payload(json!(null));
        assert_eq!(valid.checked().unwrap().class_name, "7A");

        let mut missing = payload(json!(null));
        missing.academic_year = "  ".to_string();
        assert!(missing.checked().is_err());
    }
}
