//! Student accounts.

pub mod password;

use thiserror::Error;

use crate::db::{DbPool, NewUser, User};

#[derive(Debug, Error)]
pub enum StudentError {
    #[error("A user with this username already exists.")]
    DuplicateUsername,
    #[error("Failed to hash password")]
    PasswordHash,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Already validated input for a new account
#[derive(Debug, Clone)]
pub struct CreateStudent {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Create a non-staff account. The password is hashed before it is stored.
pub async fn create_student(db: &DbPool, request: &CreateStudent) -> Result<User, StudentError> {
    create_account(db, request, false).await
}

/// Create an account, optionally with staff rights.
pub async fn create_account(
    db: &DbPool,
    request: &CreateStudent,
    is_staff: bool,
) -> Result<User, StudentError> {
    if User::username_exists(db, &request.username).await? {
        return Err(StudentError::DuplicateUsername);
    }

    let password_hash =
        password::hash_password(&request.password).map_err(|_| StudentError::PasswordHash)?;

    let user = User::create(
        db,
        &NewUser {
            username: &request.username,
            email: &request.email,
            password_hash: &password_hash,
            is_staff,
        },
    )
    .await
    .map_err(|e| match &e {
        // Lost a race with a concurrent insert of the same username
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StudentError::DuplicateUsername
        }
        _ => StudentError::Database(e),
    })?;

    tracing::info!(user_id = user.id, username = %user.username, is_staff, "Created account");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::password::verify_password;
    use crate::db::init_in_memory;

    fn request(username: &str) -> CreateStudent {
        CreateStudent {
            username: username.to_string(),
            email: "student@example.com".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_student_hashes_password() {
        let db = init_in_memory().await.unwrap();
        let user = create_student(&db, &request("alice")).await.unwrap();

        assert!(!user.is_staff);
        assert_eq!(user.email, "student@example.com");
        assert_ne!(user.password_hash, "correct horse");
        assert!(verify_password("correct horse", &user.password_hash));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let db = init_in_memory().await.unwrap();
        create_student(&db, &request("alice")).await.unwrap();

        let err = create_student(&db, &request("alice")).await.unwrap_err();
        assert!(matches!(err, StudentError::DuplicateUsername));
        assert_eq!(err.to_string(), "A user with this username already exists.");
        assert_eq!(User::count_students(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_staff_account() {
        let db = init_in_memory().await.unwrap();
        let user = create_account(&db, &request("admin"), true).await.unwrap();

        assert!(user.is_staff);
        assert_eq!(User::count_students(&db).await.unwrap(), 0);
    }
}
