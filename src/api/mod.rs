pub mod auth;
pub mod error;
mod rentals;
mod students;
pub mod validation;
mod views;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Login boundary (public)
    let admin_routes = Router::new()
        .route("/login/", get(auth::login_page).post(auth::login_submit))
        .route("/logout/", axum::routing::post(auth::logout))
        .route("/me/", get(auth::current_user));

    // Staff pages; each handler takes a `StaffUser`
    let staff_routes = Router::new()
        .route("/", get(rentals::dashboard))
        .route("/dashboard/", get(rentals::dashboard))
        .route(
            "/rentals/add/",
            get(rentals::add_rental_form).post(rentals::add_rental),
        )
        .route(
            "/rentals/extend/",
            get(rentals::extend_rental_form).post(rentals::extend_rental),
        )
        .route("/students/:id/rentals/", get(rentals::student_rentals))
        .route(
            "/students/add/",
            get(students::add_student_form).post(students::add_student),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/admin", admin_routes)
        .merge(staff_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
