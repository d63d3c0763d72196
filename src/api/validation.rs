//! Input validation for form submissions.
//!
//! Checks return `Result<(), String>` (or the parsed value) with a message
//! fit to show back on the form. Use `ValidationErrorBuilder` from the
//! `error` module to collect several of them.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Letters, digits and @ . + - _
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();

    /// Loose address check: something@domain.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)+$"
    ).unwrap();
}

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_TITLE_LENGTH: usize = 255;

/// Form date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "Username is too long (max {} characters)",
            MAX_USERNAME_LENGTH
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username may only contain letters, digits and @/./+/-/_ characters".to_string(),
        );
    }

    Ok(())
}

/// Validate an optional email address; empty means none given
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Ok(());
    }

    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Enter a valid email address".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title is too long (max {} characters)",
            MAX_TITLE_LENGTH
        ));
    }
    Ok(())
}

/// Parse a record id from a form field
pub fn parse_id(value: &str, what: &str) -> Result<i64, String> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("Invalid {} selected.", what))
}

pub fn parse_end_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| "Invalid end date format.".to_string())
}

pub fn parse_extra_months(value: &str) -> Result<i64, String> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|months| *months > 0)
        .ok_or_else(|| "Please enter a valid number of extra months.".to_string())
}

/// Only same-site absolute paths are accepted as post-login redirects
pub fn is_local_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
