use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct RolePayload {
    #[serde(default, alias = "roleName", alias = "name")]
    pub(crate) role_name: Option<String>,
}

impl RolePayload {
    pub(crate) fn trimmed_name(&self) -> Option<&str> {
        self.role_name.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleCreated {
    pub(crate) message: &'static str,
    pub(crate) role_id: i64,
}
