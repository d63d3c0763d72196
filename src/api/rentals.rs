use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::StaffUser;
use super::error::ApiError;
use super::validation::{parse_end_date, parse_extra_months, parse_id, validate_title};
use super::views::{
    render_form, set_flash, take_flash, AddRentalPage, DashboardPage, ExtendRentalPage,
    FormState, StudentRentalsPage,
};
use crate::db::{DbPool, Rental, User};
use crate::rentals::{self, CreateRental, PageCountSource, RentalError, DAYS_PER_MONTH};
use crate::AppState;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Deserialize)]
pub struct AddRentalForm {
    #[serde(default)]
    pub student: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtendRentalForm {
    #[serde(default)]
    pub rental: String,
    #[serde(default)]
    pub extra_months: String,
}

/// Aggregate view of students, rentals and revenue
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    StaffUser(_staff): StaffUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DashboardPage>), ApiError> {
    let db = &state.db;

    let page = DashboardPage {
        total_students: User::count_students(db).await?,
        total_rentals: Rental::count_all(db).await?,
        active_rentals: Rental::count_active(db, today()).await?,
        total_revenue: Rental::total_revenue(db).await?,
        first_student: User::first_student(db).await?.map(Into::into),
        message: None,
    };

    let (jar, message) = take_flash(jar);
    Ok((jar, Json(DashboardPage { message, ..page })))
}

async fn add_rental_page(db: &DbPool, form: FormState) -> Result<Response, ApiError> {
    let students = User::list_students(db).await?;
    let ok = form.is_ok();
    let page = AddRentalPage {
        students: students.into_iter().map(Into::into).collect(),
        initial_end_date: today() + Duration::days(DAYS_PER_MONTH),
        form,
    };
    Ok(render_form(ok, page))
}

pub async fn add_rental_form(
    State(state): State<Arc<AppState>>,
    StaffUser(_staff): StaffUser,
) -> Result<Response, ApiError> {
    add_rental_page(&state.db, FormState::default()).await
}

/// Validate the add-rental form in the order its errors are reported
fn parse_add_rental(form: &AddRentalForm) -> Result<CreateRental, String> {
    let title = form.title.trim();
    if form.student.trim().is_empty() || title.is_empty() || form.end_date.trim().is_empty() {
        return Err("All fields are required.".to_string());
    }

    let end_date = parse_end_date(&form.end_date)?;
    let user_id = parse_id(&form.student, "student")?;
    validate_title(title)?;

    Ok(CreateRental {
        user_id,
        title: title.to_string(),
        end_date,
    })
}

pub async fn add_rental(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    jar: CookieJar,
    Form(form): Form<AddRentalForm>,
) -> Result<Response, ApiError> {
    let request = match parse_add_rental(&form) {
        Ok(request) => request,
        Err(message) => return add_rental_page(&state.db, FormState::error(message)).await,
    };

    match rentals::create_rental(&state.db, state.book_lookup.as_ref(), &request, today()).await {
        Ok(rental) => {
            tracing::info!(rental_id = rental.id, staff = %staff.username, "Rental added");
            let jar = set_flash(jar, "Rental created successfully.");
            Ok((jar, Redirect::to("/dashboard/")).into_response())
        }
        Err(RentalError::Invalid(message)) => {
            add_rental_page(&state.db, FormState::error(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn extend_rental_page(db: &DbPool, form: FormState) -> Result<Response, ApiError> {
    let rentals = Rental::list_with_details(db).await?;
    let ok = form.is_ok();
    let page = ExtendRentalPage {
        rentals: rentals.into_iter().map(Into::into).collect(),
        form,
    };
    Ok(render_form(ok, page))
}

pub async fn extend_rental_form(
    State(state): State<Arc<AppState>>,
    StaffUser(_staff): StaffUser,
) -> Result<Response, ApiError> {
    extend_rental_page(&state.db, FormState::default()).await
}

fn parse_extend_rental(form: &ExtendRentalForm) -> Result<(i64, i64), String> {
    let extra_months = parse_extra_months(&form.extra_months)?;
    if form.rental.trim().is_empty() {
        return Err("Please select a rental to extend.".to_string());
    }
    let rental_id = parse_id(&form.rental, "rental")?;
    Ok((rental_id, extra_months))
}

pub async fn extend_rental(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    jar: CookieJar,
    Form(form): Form<ExtendRentalForm>,
) -> Result<Response, ApiError> {
    let (rental_id, extra_months) = match parse_extend_rental(&form) {
        Ok(parsed) => parsed,
        Err(message) => return extend_rental_page(&state.db, FormState::error(message)).await,
    };

    let source = PageCountSource::from_snapshot_flag(state.config.rentals.snapshot_page_count);

    match rentals::extend_rental(&state.db, rental_id, extra_months, source).await {
        Ok(rental) => {
            tracing::info!(rental_id = rental.id, staff = %staff.username, "Rental extended");
            let jar = set_flash(
                jar,
                format!("Rental extended successfully by {} month(s).", extra_months),
            );
            Ok((jar, Redirect::to("/dashboard/")).into_response())
        }
        Err(RentalError::Invalid(message)) => {
            extend_rental_page(&state.db, FormState::error(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// One student's rental history
pub async fn student_rentals(
    State(state): State<Arc<AppState>>,
    StaffUser(_staff): StaffUser,
    Path(student_id): Path<i64>,
) -> Result<Json<StudentRentalsPage>, ApiError> {
    let db = &state.db;

    let selected = User::find_by_id(db, student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    let students = User::list_students(db).await?;
    let rentals = Rental::list_for_user(db, selected.id).await?;

    Ok(Json(StudentRentalsPage {
        students: students.into_iter().map(Into::into).collect(),
        selected_student: selected.into(),
        rentals: rentals.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_form(student: &str, title: &str, end_date: &str) -> AddRentalForm {
        AddRentalForm {
            student: student.to_string(),
            title: title.to_string(),
            end_date: end_date.to_string(),
        }
    }

    #[test]
    fn test_parse_add_rental() {
        let request = parse_add_rental(&add_form("3", "  Dune ", "2026-03-01")).unwrap();
        assert_eq!(request.user_id, 3);
        assert_eq!(request.title, "Dune");

        assert_eq!(
            parse_add_rental(&add_form("", "Dune", "2026-03-01")).unwrap_err(),
            "All fields are required."
        );
        assert_eq!(
            parse_add_rental(&add_form("3", "   ", "2026-03-01")).unwrap_err(),
            "All fields are required."
        );
        assert_eq!(
            parse_add_rental(&add_form("3", "Dune", "01/03/2026")).unwrap_err(),
            "Invalid end date format."
        );
        assert!(parse_add_rental(&add_form("x", "Dune", "2026-03-01")).is_err());
    }

    #[test]
    fn test_parse_extend_rental_checks_months_first() {
        let form = ExtendRentalForm {
            rental: String::new(),
            extra_months: "zero".to_string(),
        };
        assert_eq!(
            parse_extend_rental(&form).unwrap_err(),
            "Please enter a valid number of extra months."
        );

        let form = ExtendRentalForm {
            rental: String::new(),
            extra_months: "2".to_string(),
        };
        assert_eq!(
            parse_extend_rental(&form).unwrap_err(),
            "Please select a rental to extend."
        );

        let form = ExtendRentalForm {
            rental: "5".to_string(),
            extra_months: "2".to_string(),
        };
        assert_eq!(parse_extend_rental(&form).unwrap(), (5, 2));
    }
}
