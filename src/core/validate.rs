//! Form validation run before any request is issued
//!
//! A failing field blocks submission entirely; errors render inline per
//! field. These checks are the only deliberately designed error paths on
//! the auth forms.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

const MIN_PASSWORD_CHARS: usize = 8;
const MIN_NAME_CHARS: usize = 3;

/// Per-field validation errors; `None` means the field passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FieldErrors {
    /// True when submission may proceed.
    pub fn is_valid(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

fn check_email(email: &str) -> Option<&'static str> {
    (!EMAIL_RE.is_match(email)).then_some("Please enter a valid email address")
}

fn check_password(password: &str) -> Option<&'static str> {
    (password.chars().count() < MIN_PASSWORD_CHARS)
        .then_some("Password must be at least 8 characters")
}

pub fn validate_login(email: &str, password: &str) -> FieldErrors {
    FieldErrors {
        name: None,
        email: check_email(email),
        password: check_password(password),
    }
}

pub fn validate_signup(name: &str, email: &str, password: &str) -> FieldErrors {
    FieldErrors {
        name: (name.chars().count() < MIN_NAME_CHARS)
            .then_some("Name must be at least 3 characters"),
        email: check_email(email),
        password: check_password(password),
    }
}
