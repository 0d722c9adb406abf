//! crates/finance_core/src/validation/accounts.rs
//!
//! Rules for registration, login and identity updates. Uniqueness needs storage,
//! so it is checked by the caller after these pass.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use super::{FieldErrors, FieldReader, Record, Validate};
use crate::domain::{NewUser, UserUpdate};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

const MIN_PASSWORD_LEN: usize = 8;

/// A validated sign-up request.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: NewUser,
    pub password: String,
}

/// A syntactically complete login request.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub username: String,
    pub password: String,
}

fn read_email(fields: &mut FieldReader<'_>) -> Option<String> {
    let email = fields.text("email", 3, 254)?;
    if EMAIL_RE.is_match(&email) {
        Some(email)
    } else {
        fields.error("email", "Enter a valid email address.");
        None
    }
}

fn read_name(fields: &mut FieldReader<'_>, field: &str) -> Option<String> {
    fields.text(field, 2, 150)
}

fn check_password(fields: &mut FieldReader<'_>, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        fields.error(
            "password",
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        fields.error("password", "This password is entirely numeric.");
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit())
    {
        fields.error(
            "password",
            "Password must contain at least one letter and one number.",
        );
    }
}

impl Validate for Registration {
    fn validate(record: &Record, _today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);

        let username = fields.text("username", 3, 150);
        if let Some(name) = &username {
            fields.ensure(
                "username",
                USERNAME_RE.is_match(name),
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let email = read_email(&mut fields);

        let password = fields.secret("password");
        let password2 = fields.secret("password2");
        if let Some(password) = &password {
            check_password(&mut fields, password);
            if let Some(confirmation) = &password2 {
                fields.ensure(
                    "password",
                    password == confirmation,
                    "Password fields didn't match.",
                );
            }
        }

        let first_name = read_name(&mut fields, "first_name");
        let last_name = read_name(&mut fields, "last_name");

        fields.finish(move || {
            Some(Registration {
                user: NewUser {
                    username: username?,
                    email: email?,
                    first_name: first_name?,
                    last_name: last_name?,
                },
                password: password?,
            })
        })
    }
}

impl Validate for LoginAttempt {
    fn validate(record: &Record, _today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);
        let username = fields.text("username", 1, 150);
        let password = fields.secret("password");
        fields.finish(move || Some(LoginAttempt { username: username?, password: password? }))
    }
}

impl Validate for UserUpdate {
    fn validate(record: &Record, _today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);
        let email = read_email(&mut fields);
        let first_name = read_name(&mut fields, "first_name");
        let last_name = read_name(&mut fields, "last_name");
        fields.finish(move || {
            Some(UserUpdate {
                email: email?,
                first_name: first_name?,
                last_name: last_name?,
            })
        })
    }
}
