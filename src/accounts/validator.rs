use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;

use crate::accounts::service;
use crate::error::FieldError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// The field error produced when an email is already registered. The same
/// error is used by the pre-flight check below and by the unique-violation
/// fallback in the service, so both paths look identical to the caller.
pub fn email_exists(email: &str) -> FieldError {
    FieldError::new(
        "email",
        "exists",
        format!("This account has already been registered ({})", email),
    )
}

/// Uniqueness pre-flight: a field error on `email` when an account with the
/// same (normalized) address exists. Structural checks live at the API
/// boundary; this component owns only the domain rule.
pub async fn validate_new(db: &PgPool, email: &str) -> Result<Vec<FieldError>, sqlx::Error> {
    let mut errors = Vec::new();
    if service::account_exists(db, email).await? {
        errors.push(email_exists(email));
    }
    Ok(errors)
}
