use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::ApiError;
use super::validation::is_local_redirect;
use crate::config::AuthConfig;
use crate::db::{DbPool, Session, User, UserResponse};
use crate::students::password::verify_password;
use crate::students::{create_account, CreateStudent};
use crate::AppState;

pub const SESSION_COOKIE: &str = "rewardz_session";
pub const LOGIN_PATH: &str = "/admin/login/";

const QUERY_ORIGIN: &str = "http://localhost/";

const INVALID_LOGIN: &str =
    "Please enter the correct username and password for a staff account.";

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Start a session for `user` and return the raw token
pub async fn start_session(
    db: &DbPool,
    config: &AuthConfig,
    user: &User,
) -> Result<String, ApiError> {
    let token = generate_token();
    let expires_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(config.session_ttl_days))
        .ok_or_else(|| ApiError::internal("Invalid session lifetime"))?
        .to_rfc3339();

    Session::create(db, user.id, &hash_token(&token), &expires_at).await?;
    Ok(token)
}

/// Resolve the account behind a raw session token
pub async fn user_for_token(db: &DbPool, token: &str) -> Result<Option<User>, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    Session::find_user(db, &hash_token(token), &now).await
}

/// Extract the token from the session cookie or a bearer header
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(auth_header) = parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// Login page location that returns the visitor to `next` afterwards
fn login_location(next: &str) -> String {
    // Only the encoded query string is used; the origin is a placeholder
    match reqwest::Url::parse_with_params(QUERY_ORIGIN, &[("next", next)]) {
        Ok(url) => format!("{}?{}", LOGIN_PATH, url.query().unwrap_or_default()),
        Err(_) => LOGIN_PATH.to_string(),
    }
}

fn login_redirect(next: &str) -> Response {
    Redirect::to(&login_location(next)).into_response()
}

/// An authenticated staff member. Anyone else is sent to the login page.
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let Some(token) = extract_token(parts) else {
            return Err(login_redirect(&next));
        };

        let user = user_for_token(&state.db, &token)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;

        match user {
            Some(user) if user.is_staff => Ok(StaffUser(user)),
            Some(user) => {
                tracing::warn!(user_id = user.id, path = %next, "Non-staff account denied");
                Err(login_redirect(&next))
            }
            None => Err(login_redirect(&next)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginPage {
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}

/// Login form
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        next: query.next,
        error: None,
    })
}

/// Login endpoint: verifies credentials and sets the session cookie
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let username = form.username.trim();
    let next = form
        .next
        .filter(|n| is_local_redirect(n))
        .unwrap_or_else(|| "/dashboard/".to_string());

    let user = User::find_by_username(&state.db, username).await?;
    let user = match user {
        Some(user) if user.is_staff && verify_password(&form.password, &user.password_hash) => user,
        _ => {
            tracing::warn!(username = %username, "Failed staff login");
            let page = LoginPage {
                next: Some(next),
                error: Some(INVALID_LOGIN.to_string()),
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response());
        }
    };

    let token = start_session(&state.db, &state.config.auth, &user).await?;
    tracing::info!(user_id = user.id, username = %user.username, "Staff login");

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.secure_cookies);

    Ok((jar.add(cookie), Redirect::to(&next)).into_response())
}

/// Logout endpoint: drops the session and clears the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        Session::delete_by_token_hash(&state.db, &hash_token(cookie.value())).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to(LOGIN_PATH)))
}

/// Who am I, for bearer-token clients
pub async fn current_user(StaffUser(user): StaffUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse { user: user.into() })
}

/// Ensure the configured staff account exists.
pub async fn ensure_admin_user(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        if User::count_staff(db).await? == 0 {
            tracing::warn!(
                "No staff account exists; set auth.admin_username and auth.admin_password \
                 or run `rewardz create-staff`"
            );
        }
        return Ok(());
    };

    if let Some(existing) = User::find_by_username(db, username).await? {
        if !existing.is_staff {
            tracing::warn!(
                username = %username,
                "Configured admin account exists but is not staff"
            );
        }
        return Ok(());
    }

    create_account(
        db,
        &CreateStudent {
            username: username.clone(),
            email: String::new(),
            password: password.clone(),
        },
        true,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create admin user: {}", e))?;

    tracing::info!(username = %username, "Created admin user");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, NewUser};

    #[test]
    fn test_login_location_encodes_next() {
        assert_eq!(login_location("/dashboard/"), "/admin/login/?next=%2Fdashboard%2F");
        assert_eq!(
            login_location("/students/3/rentals/?page=2&sort=end date"),
            "/admin/login/?next=%2Fstudents%2F3%2Frentals%2F%3Fpage%3D2%26sort%3Dend+date"
        );
    }

    #[test]
    fn test_tokens() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let db = init_in_memory().await.unwrap();
        let user = User::create(
            &db,
            &NewUser {
                username: "staff",
                email: "",
                password_hash: "hash",
                is_staff: true,
            },
        )
        .await
        .unwrap();

        let token = start_session(&db, &AuthConfig::default(), &user).await.unwrap();
        let found = user_for_token(&db, &token).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(user_for_token(&db, "bogus").await.unwrap().is_none());

        let expired = AuthConfig {
            session_ttl_days: -1,
            ..AuthConfig::default()
        };
        let stale = start_session(&db, &expired, &user).await.unwrap();
        assert!(user_for_token(&db, &stale).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_admin_user() {
        let db = init_in_memory().await.unwrap();

        ensure_admin_user(&db, &AuthConfig::default()).await.unwrap();
        assert_eq!(User::count_staff(&db).await.unwrap(), 0);

        let config = AuthConfig {
            admin_username: Some("admin".to_string()),
            admin_password: Some("s3cret-pass".to_string()),
            ..AuthConfig::default()
        };
        ensure_admin_user(&db, &config).await.unwrap();
        ensure_admin_user(&db, &config).await.unwrap();

        let admin = User::find_by_username(&db, "admin").await.unwrap().unwrap();
        assert!(admin.is_staff);
        assert!(verify_password("s3cret-pass", &admin.password_hash));
        assert_eq!(User::count_staff(&db).await.unwrap(), 1);
    }
}
