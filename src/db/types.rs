use serde::{Deserialize, Serialize};

/// Built-in roles; the discriminants are the seeded `roles.role_id` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub(crate) const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Teacher, UserRole::Student];

    pub(crate) fn from_id(role_id: i64) -> Option<Self> {
        match role_id {
            1 => Some(Self::Admin),
            2 => Some(Self::Teacher),
            3 => Some(Self::Student),
            _ => None,
        }
    }

    pub(crate) fn id(self) -> i64 {
        match self {
            Self::Admin => 1,
            Self::Teacher => 2,
            Self::Student => 3,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    pub(crate) fn is_builtin(role_id: i64) -> bool {
        Self::from_id(role_id).is_some()
    }
}

/// Kind of account created by the admin user screens and the roster import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserEntity {
    Student,
    Teacher,
}

impl UserEntity {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            _ => None,
        }
    }

    pub(crate) fn role(self) -> UserRole {
        match self {
            Self::Student => UserRole::Student,
            Self::Teacher => UserRole::Teacher,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuizStatus {
    Upcoming,
    Live,
    Finished,
}

impl QuizStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Live => "live",
            Self::Finished => "finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip_through_from_id() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::from_id(role.id()), Some(role));
        }
        assert_eq!(UserRole::from_id(4), None);
        assert!(!UserRole::is_builtin(0));
    }

    #[test]
    fn entity_parse_is_case_insensitive() {
        assert_eq!(UserEntity::parse(" Student "), Some(UserEntity::Student));
        assert_eq!(UserEntity::parse("TEACHER"), Some(UserEntity::Teacher));
        assert_eq!(UserEntity::parse("admin"), None);
        assert_eq!(UserEntity::Teacher.role(), UserRole::Teacher);
    }
}
