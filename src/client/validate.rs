//! Input checks run before any request leaves the client.

use crate::error::{Error, Result};
use regex::Regex;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).map_or(false, |re| re.is_match(email.trim()))
}

/// # Errors
/// Returns [`Error::Validation`] when the email is malformed.
pub fn email(email: &str) -> Result<()> {
    if valid_email(email) {
        Ok(())
    } else {
        Err(Error::Validation("Please enter a valid email address.".into()))
    }
}

/// # Errors
/// Returns [`Error::Validation`] naming `field` when `value` is blank.
pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::Validation(format!("{field} is required.")))
    } else {
        Ok(())
    }
}

/// # Errors
/// Returns [`Error::Validation`] when a supplied confirmation differs.
pub fn confirmation(password: &str, confirm: Option<&str>) -> Result<()> {
    match confirm {
        Some(confirm) if confirm != password => {
            Err(Error::Validation("Passwords do not match".into()))
        }
        _ => Ok(()),
    }
}
