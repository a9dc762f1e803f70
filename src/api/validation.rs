use std::borrow::Cow;

use validator::ValidationError;

pub(crate) const MIN_PASSWORD_LEN: usize = 6;
const USERNAME_MIN_TAIL: usize = 2;
const USERNAME_MAX_TAIL: usize = 20;

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// A letter followed by 2..=20 letters, digits or underscores.
pub(crate) fn is_valid_username(username: &str) -> bool {
    let mut chars = username.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }

    let tail = chars.as_str();
    (USERNAME_MIN_TAIL..=USERNAME_MAX_TAIL).contains(&tail.len())
        && tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(field_error("required", "Username is required."));
    }
    if !is_valid_username(username) {
        return Err(field_error(
            "username",
            "Username must start with a letter and be 3 to 21 characters of letters, digits or _.",
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(field_error("required", "Password is required."));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(field_error("length", "Password must be at least 6 characters."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rule_matches_letter_then_word_characters() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("Teacher_01"));
        assert!(is_valid_username(&format!("a{}", "b".repeat(20))));

        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("1abc"));
        assert!(!is_valid_username("_abc"));
        assert!(!is_valid_username("ab-c"));
        assert!(!is_valid_username(&format!("a{}", "b".repeat(21))));
    }

    #[test]
    fn messages_distinguish_missing_from_invalid() {
        let missing = validate_username("").unwrap_err();
        assert_eq!(missing.message.as_deref(), Some("Username is required."));

        let short = validate_password("12345").unwrap_err();
        assert_eq!(short.message.as_deref(), Some("Password must be at least 6 characters."));
        assert!(validate_password("123456").is_ok());
    }
}
