use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use super::auth::StaffUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password, validate_username};
use super::views::{render_form, set_flash, AddStudentPage, FormState};
use crate::students::{create_student, CreateStudent, StudentError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddStudentForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn page(form: FormState) -> Response {
    let ok = form.is_ok();
    render_form(ok, AddStudentPage { form })
}

pub async fn add_student_form(StaffUser(_staff): StaffUser) -> Response {
    page(FormState::default())
}

/// Trim and validate the form, reporting every failing field
fn parse_add_student(form: &AddStudentForm) -> Result<CreateStudent, ApiError> {
    let request = CreateStudent {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.trim().to_string(),
    };

    if request.username.is_empty() || request.password.is_empty() {
        let mut errors = ValidationErrorBuilder::new();
        errors.check("username", validate_username(&request.username));
        errors.check("password", validate_password(&request.password));
        return Err(ApiError::validation_message(
            "Username and password are required.",
            errors,
        ));
    }

    let mut errors = ValidationErrorBuilder::new();
    errors.check("username", validate_username(&request.username));
    errors.check("email", validate_email(&request.email));
    errors.finish()?;

    Ok(request)
}

pub async fn add_student(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    jar: CookieJar,
    Form(form): Form<AddStudentForm>,
) -> Result<Response, ApiError> {
    let request = match parse_add_student(&form) {
        Ok(request) => request,
        Err(err) => return Ok(page(err.into())),
    };

    match create_student(&state.db, &request).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, staff = %staff.username, "Student added");
            let jar = set_flash(jar, "Student created successfully.");
            Ok((jar, Redirect::to("/dashboard/")).into_response())
        }
        Err(StudentError::DuplicateUsername) => Ok(page(FormState::error(
            StudentError::DuplicateUsername.to_string(),
        ))),
        Err(e) => Err(e.into()),
    }
}
