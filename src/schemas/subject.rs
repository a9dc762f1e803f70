use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectPayload {
    #[serde(default, alias = "subjectName", alias = "name")]
    #[validate(length(max = 100, message = "subject_name is too long"))]
    pub(crate) subject_name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

impl SubjectPayload {
    pub(crate) fn name(&self) -> Option<&str> {
        Some(self.subject_name.trim()).filter(|name| !name.is_empty())
    }

    /// Blank descriptions are stored as NULL.
    pub(crate) fn description(&self) -> Option<&str> {
        self.description.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }
}
