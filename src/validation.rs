//! Client-side checks for the auth forms, run before any request is sent.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

pub fn check_email(email: &str) -> Option<FieldError> {
    let email = email.trim();
    if email.is_empty() {
        Some(FieldError::new(Field::Email, "Email is required."))
    } else if !email_pattern().is_match(email) {
        Some(FieldError::new(Field::Email, "Please enter a valid email address."))
    } else {
        None
    }
}

pub fn check_password(password: &str) -> Option<FieldError> {
    if password.is_empty() {
        return Some(FieldError::new(Field::Password, "Password is required."));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Some(FieldError::new(
            Field::Password,
            "Password must be at least 8 characters long.",
        ));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Some(FieldError::new(
            Field::Password,
            "Password must contain at least one letter and one number.",
        ));
    }
    None
}

fn check_confirmation(password: &str, confirm: &str) -> Option<FieldError> {
    (password != confirm)
        .then(|| FieldError::new(Field::ConfirmPassword, "Passwords do not match."))
}

/// Login only checks presence and email shape; strength rules apply at registration.
pub fn validate_login(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = check_email(email).into_iter().collect();
    if password.is_empty() {
        errors.push(FieldError::new(Field::Password, "Password is required."));
    }
    errors
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError::new(Field::Name, "Name is required."));
    }
    errors.extend(check_email(email));
    errors.extend(check_password(password));
    errors.extend(check_confirmation(password, confirm));
    errors
}

pub fn validate_password_reset(token: &str, password: &str, confirm: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if token.trim().is_empty() {
        errors.push(FieldError::new(
            Field::Token,
            "This reset link is invalid or incomplete.",
        ));
    }
    errors.extend(check_password(password));
    errors.extend(check_confirmation(password, confirm));
    errors
}

/// Joins field errors into a single line for inline display.
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(errors: &[FieldError]) -> Vec<Field> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn email_shapes() {
        assert!(check_email("ada@example.com").is_none());
        assert!(check_email("  ada@example.co.uk ").is_none());
        assert!(check_email("").is_some());
        assert!(check_email("ada@example").is_some());
        assert!(check_email("ada example@x.com").is_some());
    }

    #[test]
    fn password_strength() {
        assert!(check_password("abcdefg1").is_none());
        assert_eq!(
            check_password("abc1").unwrap().message,
            "Password must be at least 8 characters long."
        );
        assert!(check_password("abcdefgh").is_some());
        assert!(check_password("12345678").is_some());
    }

    #[test]
    fn registration_collects_every_error() {
        let errors = validate_registration(" ", "bad", "short", "other");
        assert_eq!(
            fields(&errors),
            vec![Field::Name, Field::Email, Field::Password, Field::ConfirmPassword]
        );
        assert!(validate_registration("Ada", "ada@example.com", "secret123", "secret123").is_empty());
    }

    #[test]
    fn login_does_not_apply_strength_rules() {
        assert!(validate_login("ada@example.com", "x").is_empty());
        assert_eq!(fields(&validate_login("", "")), vec![Field::Email, Field::Password]);
    }

    #[test]
    fn reset_requires_token() {
        let errors = validate_password_reset("", "secret123", "secret123");
        assert_eq!(fields(&errors), vec![Field::Token]);
        assert_eq!(summarize(&errors), "This reset link is invalid or incomplete.");
    }
}
