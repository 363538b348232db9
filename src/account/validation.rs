//! Form validation and the error list shown back to the user.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::types::{Credentials, RegistrationRequest, ResetRequest};

const PASSWORD_MIN_LENGTH: usize = 6;
const PASSWORD_MAX_LENGTH: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormError {
    /// `None` for form-level errors (shown in the summary).
    pub field: Option<Field>,
    pub message: String,
}

/// Ordered error list, the equivalent of a model state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors {
    entries: Vec<FormError>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_form_error(&mut self, message: impl Into<String>) {
        self.entries.push(FormError {
            field: None,
            message: message.into(),
        });
    }

    pub fn add_field_error(&mut self, field: Field, message: impl Into<String>) {
        self.entries.push(FormError {
            field: Some(field),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormError> {
        self.entries.iter()
    }

    /// Form-level messages in insertion order.
    #[must_use]
    pub fn summary(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.field.is_none())
            .map(|entry| entry.message.as_str())
            .collect()
    }

    #[must_use]
    pub fn for_field(&self, field: Field) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.field == Some(field))
            .map(|entry| entry.message.as_str())
            .collect()
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn check_email(errors: &mut FormErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add_field_error(Field::Email, "The Email field is required.");
    } else if !valid_email(email.trim()) {
        errors.add_field_error(Field::Email, "The Email field is not a valid e-mail address.");
    }
}

fn check_new_password(errors: &mut FormErrors, password: &SecretString, confirm: &SecretString) {
    let password = password.expose_secret();
    let length = password.chars().count();
    if password.is_empty() {
        errors.add_field_error(Field::Password, "The Password field is required.");
    } else if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&length) {
        errors.add_field_error(
            Field::Password,
            format!(
                "The Password must be at least {PASSWORD_MIN_LENGTH} and at max {PASSWORD_MAX_LENGTH} characters long."
            ),
        );
    }
    if password != confirm.expose_secret() {
        errors.add_field_error(
            Field::ConfirmPassword,
            "The password and confirmation password do not match.",
        );
    }
}

impl Credentials {
    #[must_use]
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_email(&mut errors, &self.email);
        if self.password.expose_secret().is_empty() {
            errors.add_field_error(Field::Password, "The Password field is required.");
        }
        errors
    }
}

impl RegistrationRequest {
    #[must_use]
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_email(&mut errors, &self.email);
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors
    }
}

impl ResetRequest {
    #[must_use]
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_email(&mut errors, &self.target_email);
        check_new_password(&mut errors, &self.new_password, &self.confirm_password);
        errors
    }
}
