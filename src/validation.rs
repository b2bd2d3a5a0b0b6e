//! Field validation at submit time
//!
//! The profile core only knows the [`Validator`] trait. [`StandardRules`] is
//! the rule table the dashboard ships with.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::profile::{ProfileAggregate, ProfileField};

/// A rejected field and the message to show next to it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub trait Validator {
    /// `None` if `value` is acceptable for `field`
    fn validate(&self, field: &str, value: &str) -> Option<String>;
}

impl<F> Validator for F
where
    F: Fn(&str, &str) -> Option<String>,
{
    fn validate(&self, field: &str, value: &str) -> Option<String> {
        self(field, value)
    }
}

/// Run every scalar field and every link URL through `validator`
pub fn validate_profile(validator: &dyn Validator, profile: &ProfileAggregate) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = ProfileField::ALL
        .into_iter()
        .filter_map(|field| {
            validator
                .validate(field.as_str(), profile.field(field))
                .map(|message| FieldError::new(field.as_str(), message))
        })
        .collect();

    for (index, link) in profile.links.iter().enumerate() {
        if let Some(message) = validator.validate("links.url", &link.url) {
            errors.push(FieldError::new(format!("links[{index}].url"), message));
        }
    }

    errors
}

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zА-Яа-яёЁ\-\s]+$").expect("name pattern compiles"));
static JOB_TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zА-Яа-яёЁ0-9\s\-]+$").expect("job title pattern compiles"));
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{10,15}$").expect("phone pattern compiles"));
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));

/// Default rule table.
///
/// `name`, `lastName`, `phone` and `email` are required; `jobTitle`,
/// `address` and `pitch` are optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl Validator for StandardRules {
    fn validate(&self, field: &str, value: &str) -> Option<String> {
        let len = value.chars().count();
        match field {
            "name" => {
                if value.trim().is_empty() {
                    Some("*The field \"Name\" is required".to_string())
                } else if len < 2 {
                    Some("At least 2 characters required".to_string())
                } else if len > 50 {
                    Some("Maximum 50 characters allowed".to_string())
                } else if !NAME_PATTERN.is_match(value) {
                    Some("Only letters and spaces are allowed".to_string())
                } else {
                    None
                }
            }
            "lastName" => {
                if value.trim().is_empty() {
                    Some("*The field \"Last Name\" is required".to_string())
                } else if !NAME_PATTERN.is_match(value) {
                    Some("Only letters and spaces are allowed".to_string())
                } else {
                    None
                }
            }
            "jobTitle" => {
                if value.is_empty() {
                    None
                } else if len > 100 {
                    Some("Maximum 100 characters allowed".to_string())
                } else if !JOB_TITLE_PATTERN.is_match(value) {
                    Some("Only letters, numbers, spaces, and hyphens are allowed".to_string())
                } else {
                    None
                }
            }
            "phone" => {
                if value.trim().is_empty() {
                    Some("*The field \"Phone\" is required".to_string())
                } else if !PHONE_PATTERN.is_match(value) {
                    Some("Invalid phone number".to_string())
                } else {
                    None
                }
            }
            "email" => {
                if value.trim().is_empty() {
                    Some("*The field \"Email\" is required".to_string())
                } else if !EMAIL_PATTERN.is_match(value) {
                    Some("You entered the wrong e-mail.".to_string())
                } else {
                    None
                }
            }
            "links.url" => {
                if value.is_empty() || url::Url::parse(value).is_ok() {
                    None
                } else {
                    Some("Invalid URL".to_string())
                }
            }
            _ => None,
        }
    }
}
