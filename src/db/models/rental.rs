//! Rental models and DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use crate::rentals::fees::from_cents;

/// A rental row. Fees are stored as integer cents and exposed as decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Rental {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub months_rented: i64,
    pub monthly_fee_cents: i64,
    pub total_fee_cents: i64,
    /// Page count of the book when the rental was created
    pub book_pages: i64,
    pub version: i64,
}

impl Rental {
    pub fn monthly_fee(&self) -> Decimal {
        from_cents(self.monthly_fee_cents)
    }

    pub fn total_fee(&self) -> Decimal {
        from_cents(self.total_fee_cents)
    }
}

/// Rental joined with its book and renter
#[derive(Debug, Clone, FromRow)]
pub struct RentalDetails {
    #[sqlx(flatten)]
    pub rental: Rental,
    pub book_title: String,
    pub book_author: String,
    pub username: String,
}

/// Fields for inserting a fresh rental
#[derive(Debug, Clone)]
pub struct NewRental {
    pub user_id: i64,
    pub book_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub book_pages: i64,
}

/// Values written by an extension
#[derive(Debug, Clone)]
pub struct RentalExtension {
    pub months_rented: i64,
    pub monthly_fee_cents: i64,
    pub total_fee_cents: i64,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalResponse {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub months_rented: i64,
    pub monthly_fee: Decimal,
    pub total_fee: Decimal,
}

impl From<Rental> for RentalResponse {
    fn from(rental: Rental) -> Self {
        Self {
            monthly_fee: rental.monthly_fee(),
            total_fee: rental.total_fee(),
            id: rental.id,
            user_id: rental.user_id,
            book_id: rental.book_id,
            start_date: rental.start_date,
            end_date: rental.end_date,
            months_rented: rental.months_rented,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalDetailsResponse {
    #[serde(flatten)]
    pub rental: RentalResponse,
    pub book_title: String,
    pub book_author: String,
    pub username: String,
}

impl From<RentalDetails> for RentalDetailsResponse {
    fn from(details: RentalDetails) -> Self {
        Self {
            rental: details.rental.into(),
            book_title: details.book_title,
            book_author: details.book_author,
            username: details.username,
        }
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT r.*, b.title AS book_title, b.author AS book_author, u.username AS username
    FROM rentals r
    JOIN books b ON b.id = r.book_id
    JOIN users u ON u.id = r.user_id
"#;

impl Rental {
    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        db: E,
        id: i64,
    ) -> Result<Option<Rental>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM rentals WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Insert a rental in its initial state: one free month at zero fees
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        db: E,
        new: &NewRental,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO rentals (
                user_id, book_id, start_date, end_date,
                months_rented, monthly_fee_cents, total_fee_cents, book_pages, version
            )
            VALUES (?, ?, ?, ?, 1, 0, 0, ?, 1)
            "#,
        )
        .bind(new.user_id)
        .bind(new.book_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.book_pages)
        .execute(db)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Apply an extension if the row is still at `expected_version`.
    ///
    /// Returns the number of rows written; zero means another writer got there first.
    pub async fn apply_extension<'e, E: SqliteExecutor<'e>>(
        db: E,
        id: i64,
        expected_version: i64,
        extension: &RentalExtension,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET months_rented = ?, monthly_fee_cents = ?, total_fee_cents = ?,
                end_date = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(extension.months_rented)
        .bind(extension.monthly_fee_cents)
        .bind(extension.total_fee_cents)
        .bind(extension.end_date)
        .bind(id)
        .bind(expected_version)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_all(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM rentals")
            .fetch_one(db)
            .await
    }

    /// Rentals whose end date is today or later
    pub async fn count_active(db: &SqlitePool, today: NaiveDate) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM rentals WHERE end_date >= ?")
            .bind(today)
            .fetch_one(db)
            .await
    }

    pub async fn total_revenue(db: &SqlitePool) -> Result<Decimal, sqlx::Error> {
        let cents: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(total_fee_cents), 0) FROM rentals")
            .fetch_one(db)
            .await?;
        Ok(from_cents(cents))
    }

    /// All rentals with book and renter, newest first
    pub async fn list_with_details(db: &SqlitePool) -> Result<Vec<RentalDetails>, sqlx::Error> {
        sqlx::query_as(&format!("{DETAILS_SELECT} ORDER BY r.start_date DESC, r.id DESC"))
            .fetch_all(db)
            .await
    }

    /// One student's rental history, newest start date first
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<RentalDetails>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{DETAILS_SELECT} WHERE r.user_id = ? ORDER BY r.start_date DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Book, NewUser, User};
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seed(db: &SqlitePool) -> (i64, i64) {
        let user = User::create(
            db,
            &NewUser {
                username: "reader",
                email: "",
                password_hash: "hash",
                is_staff: false,
            },
        )
        .await
        .unwrap();
        let book_id = Book::insert(db, "Dune", "Frank Herbert", 412).await.unwrap();
        (user.id, book_id)
    }

    fn new_rental(user_id: i64, book_id: i64, start: &str, end: &str) -> NewRental {
        NewRental {
            user_id,
            book_id,
            start_date: date(start),
            end_date: date(end),
            book_pages: 412,
        }
    }

    #[tokio::test]
    async fn test_insert_starts_with_free_month() {
        let db = init_in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db).await;

        let id = Rental::insert(&db, &new_rental(user_id, book_id, "2026-01-01", "2026-01-31"))
            .await
            .unwrap();
        let rental = Rental::find_by_id(&db, id).await.unwrap().unwrap();

        assert_eq!(rental.months_rented, 1);
        assert_eq!(rental.monthly_fee(), Decimal::ZERO);
        assert_eq!(rental.total_fee(), Decimal::ZERO);
        assert_eq!(rental.version, 1);
        assert_eq!(rental.end_date, date("2026-01-31"));
    }

    #[tokio::test]
    async fn test_apply_extension_checks_version() {
        let db = init_in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db).await;
        let id = Rental::insert(&db, &new_rental(user_id, book_id, "2026-01-01", "2026-01-31"))
            .await
            .unwrap();

        let extension = RentalExtension {
            months_rented: 2,
            monthly_fee_cents: 412,
            total_fee_cents: 412,
            end_date: date("2026-03-02"),
        };

        assert_eq!(Rental::apply_extension(&db, id, 1, &extension).await.unwrap(), 1);
        assert_eq!(Rental::apply_extension(&db, id, 1, &extension).await.unwrap(), 0);

        let rental = Rental::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(rental.version, 2);
        assert_eq!(rental.total_fee(), dec!(4.12));
    }

    #[tokio::test]
    async fn test_dashboard_aggregates() {
        let db = init_in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db).await;

        let expired = Rental::insert(&db, &new_rental(user_id, book_id, "2025-01-01", "2025-02-01"))
            .await
            .unwrap();
        Rental::insert(&db, &new_rental(user_id, book_id, "2026-01-01", "2026-06-01"))
            .await
            .unwrap();
        Rental::apply_extension(
            &db,
            expired,
            1,
            &RentalExtension {
                months_rented: 3,
                monthly_fee_cents: 250,
                total_fee_cents: 500,
                end_date: date("2025-04-02"),
            },
        )
        .await
        .unwrap();

        assert_eq!(Rental::count_all(&db).await.unwrap(), 2);
        assert_eq!(Rental::count_active(&db, date("2026-06-01")).await.unwrap(), 1);
        assert_eq!(Rental::count_active(&db, date("2026-06-02")).await.unwrap(), 0);
        assert_eq!(Rental::total_revenue(&db).await.unwrap(), dec!(5.00));
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let db = init_in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db).await;

        let older = Rental::insert(&db, &new_rental(user_id, book_id, "2025-01-01", "2025-02-01"))
            .await
            .unwrap();
        let newer = Rental::insert(&db, &new_rental(user_id, book_id, "2026-01-01", "2026-02-01"))
            .await
            .unwrap();

        let history = Rental::list_for_user(&db, user_id).await.unwrap();
        let ids: Vec<i64> = history.iter().map(|d| d.rental.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(history[0].book_title, "Dune");
        assert_eq!(history[0].username, "reader");

        assert!(Rental::list_for_user(&db, user_id + 100).await.unwrap().is_empty());
    }

    #[test]
    fn test_response_serializes_fees_as_decimal_strings() {
        let rental = Rental {
            id: 1,
            user_id: 1,
            book_id: 1,
            start_date: date("2026-01-01"),
            end_date: date("2026-03-02"),
            months_rented: 3,
            monthly_fee_cents: 250,
            total_fee_cents: 500,
            book_pages: 250,
            version: 3,
        };

        let json = serde_json::to_value(RentalResponse::from(rental)).unwrap();
        assert_eq!(json["monthly_fee"], "2.50");
        assert_eq!(json["total_fee"], "5.00");
        assert_eq!(json["end_date"], "2026-03-02");
    }
}
