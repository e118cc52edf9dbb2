use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::users::repo_types::UserDraft;

lazy_static! {
    static ref LETTERS_RE: Regex = Regex::new(r"^[a-zA-Z]+$").unwrap();
    // Same shape as the `checkmail` format check: local part of RFC 5322
    // atext plus dots, hostname labels of at most 63 characters.
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .unwrap();
}

/// What the user record is being validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Create,
    Update,
    Login,
}

/// First rule a draft broke. The payload names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{}", invalid_format_message(.0))]
    InvalidFormat(&'static str),
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) | Self::InvalidFormat(field) => field,
        }
    }
}

fn invalid_format_message(field: &str) -> String {
    if field == "Email" {
        "Invalid Email".to_string()
    } else {
        format!("{} must only contain letters", field)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn letters_only(value: &str) -> bool {
    LETTERS_RE.is_match(value)
}

/// Fail-fast validation of a draft for the given action.
pub fn validate(user: &UserDraft, action: Action) -> Result<(), ValidationError> {
    match action {
        Action::Login => {
            check_credentials(user)?;
        }
        Action::Create | Action::Update => {
            if user.name.is_empty() {
                return Err(ValidationError::MissingField("Name"));
            }
            if !letters_only(&user.name) {
                return Err(ValidationError::InvalidFormat("Name"));
            }
            if !user.favorite_color.is_empty() && !letters_only(&user.favorite_color) {
                return Err(ValidationError::InvalidFormat("FavoriteColor"));
            }
            if !user.favorite_operating_system.is_empty()
                && !letters_only(&user.favorite_operating_system)
            {
                return Err(ValidationError::InvalidFormat("FavoriteOperatingSystem"));
            }
            check_credentials(user)?;
        }
    }
    Ok(())
}

fn check_credentials(user: &UserDraft) -> Result<(), ValidationError> {
    if user.password.is_empty() {
        return Err(ValidationError::MissingField("Password"));
    }
    if user.email.is_empty() {
        return Err(ValidationError::MissingField("Email"));
    }
    if !is_valid_email(&user.email) {
        return Err(ValidationError::InvalidFormat("Email"));
    }
    Ok(())
}
