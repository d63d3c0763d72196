//! View models for the admin pages.
//!
//! Each page is returned as JSON. A form that fails validation comes back as
//! the same view with `error` set and status 422.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::error::ApiError;
use crate::db::{RentalDetailsResponse, UserResponse};

pub const FLASH_COOKIE: &str = "rewardz_flash";

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub total_students: i64,
    pub total_rentals: i64,
    pub active_rentals: i64,
    pub total_revenue: Decimal,
    pub first_student: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddRentalPage {
    pub students: Vec<UserResponse>,
    pub initial_end_date: NaiveDate,
    #[serde(flatten)]
    pub form: FormState,
}

#[derive(Debug, Serialize)]
pub struct ExtendRentalPage {
    pub rentals: Vec<RentalDetailsResponse>,
    #[serde(flatten)]
    pub form: FormState,
}

#[derive(Debug, Serialize)]
pub struct StudentRentalsPage {
    pub students: Vec<UserResponse>,
    pub selected_student: UserResponse,
    pub rentals: Vec<RentalDetailsResponse>,
}

#[derive(Debug, Serialize)]
pub struct AddStudentPage {
    #[serde(flatten)]
    pub form: FormState,
}

/// Outcome of a form submission shown alongside the form
#[derive(Debug, Default, Serialize)]
pub struct FormState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl FormState {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            field_errors: HashMap::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<ApiError> for FormState {
    fn from(err: ApiError) -> Self {
        Self {
            error: Some(err.message().to_string()),
            field_errors: err.details().cloned().unwrap_or_default(),
        }
    }
}

/// Render a view, as 422 if its form carries an error
pub fn render_form<T: Serialize>(form_ok: bool, page: T) -> Response {
    if form_ok {
        Json(page).into_response()
    } else {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response()
    }
}

/// Queue a one-shot message for the next dashboard view
pub fn set_flash(jar: CookieJar, message: impl Into<String>) -> CookieJar {
    let message: String = message.into();
    jar.add(
        Cookie::build((FLASH_COOKIE, message))
            .path("/")
            .http_only(true),
    )
}

/// Consume the pending flash message, if any
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) {
        Some(message) => (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(message)),
        None => (jar, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_state_serialization() {
        let page = AddStudentPage {
            form: FormState::default(),
        };
        assert_eq!(serde_json::to_value(&page).unwrap(), serde_json::json!({}));

        let page = AddStudentPage {
            form: FormState::error("Username and password are required."),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["error"], "Username and password are required.");
        assert!(json.get("field_errors").is_none());
    }

    #[test]
    fn test_form_state_from_validation_error() {
        let mut errors = HashMap::new();
        errors.insert("email".to_string(), vec!["Enter a valid email address".to_string()]);

        let form = FormState::from(ApiError::validation(errors));
        assert_eq!(form.error.as_deref(), Some("Enter a valid email address"));
        assert_eq!(form.field_errors["email"].len(), 1);
        assert!(!form.is_ok());
    }

    #[test]
    fn test_flash_is_consumed_once() {
        let jar = set_flash(CookieJar::new(), "Rental created successfully.");
        let (jar, message) = take_flash(jar);
        assert_eq!(message.as_deref(), Some("Rental created successfully."));

        let (_, message) = take_flash(jar);
        assert_eq!(message, None);
    }
}
