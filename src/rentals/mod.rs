//! Rental lifecycle.
//!
//! A rental is created with one free month and zero fees, and afterwards only
//! changes through [`extend_rental`]. Each operation runs in a single write
//! transaction so fees, month count and end date always move together. A
//! writer that cannot get the lock in time reports [`RentalError::Conflict`].

pub mod fees;

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::db::{self, Book, DbPool, NewRental, Rental, RentalExtension, User};
use crate::lookup::BookLookup;

/// Days added to the end date per extra month
pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Error)]
pub enum RentalError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("rental was modified concurrently, please retry")]
    Conflict,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RentalError {
    fn from(err: sqlx::Error) -> Self {
        // A lock that outlived the busy timeout is a lost race, not a broken database
        if db::is_busy(&err) {
            tracing::warn!(error = %err, "Rental write lost a race for the database lock");
            RentalError::Conflict
        } else {
            RentalError::Database(err)
        }
    }
}

/// Where extension pricing takes its page count from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCountSource {
    /// The book's page count at extension time
    Current,
    /// The page count recorded when the rental was created
    Snapshot,
}

impl PageCountSource {
    pub fn from_snapshot_flag(snapshot: bool) -> Self {
        if snapshot {
            PageCountSource::Snapshot
        } else {
            PageCountSource::Current
        }
    }
}

/// Validated input for a new rental
#[derive(Debug, Clone)]
pub struct CreateRental {
    pub user_id: i64,
    pub title: String,
    pub end_date: NaiveDate,
}

/// Record a rental of `title` for a student, creating the book on first use.
pub async fn create_rental(
    db: &DbPool,
    lookup: &dyn BookLookup,
    request: &CreateRental,
    today: NaiveDate,
) -> Result<Rental, RentalError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(RentalError::Invalid("Title is required".to_string()));
    }

    let user = User::find_by_id(db, request.user_id)
        .await?
        .ok_or(RentalError::NotFound("Student"))?;

    // Network call stays outside the transaction
    let metadata = lookup.fetch(title).await;

    let mut tx = db::begin_write(db).await?;

    let book = match Book::find_by_title(&mut *tx, title).await? {
        Some(mut book) => {
            let improves_placeholder = book.pages == fees::DEFAULT_PAGE_COUNT
                && !metadata.is_fallback()
                && (book.pages != metadata.pages || book.author != metadata.author);

            if improves_placeholder {
                Book::update_metadata(&mut *tx, book.id, &metadata.author, metadata.pages)
                    .await?;
                tracing::info!(
                    book_id = book.id,
                    title = %title,
                    pages = metadata.pages,
                    "Replaced placeholder book metadata"
                );
                book.author = metadata.author;
                book.pages = metadata.pages;
            }
            book
        }
        None => {
            let id = Book::insert(&mut *tx, title, &metadata.author, metadata.pages).await?;
            tracing::info!(book_id = id, title = %title, pages = metadata.pages, "Created book");
            Book {
                id,
                title: title.to_string(),
                author: metadata.author,
                pages: metadata.pages,
            }
        }
    };

    let rental_id = Rental::insert(
        &mut *tx,
        &NewRental {
            user_id: user.id,
            book_id: book.id,
            start_date: today,
            end_date: request.end_date,
            book_pages: book.pages,
        },
    )
    .await?;

    let rental = Rental::find_by_id(&mut *tx, rental_id)
        .await?
        .ok_or(RentalError::NotFound("Rental"))?;

    tx.commit().await?;

    tracing::info!(
        rental_id = rental.id,
        user_id = user.id,
        book_id = book.id,
        end_date = %rental.end_date,
        "Created rental"
    );

    Ok(rental)
}

/// Add `extra_months` billing months to a rental and re-price it.
pub async fn extend_rental(
    db: &DbPool,
    rental_id: i64,
    extra_months: i64,
    page_source: PageCountSource,
) -> Result<Rental, RentalError> {
    if extra_months <= 0 {
        return Err(RentalError::Invalid(
            "Extra months must be a positive number".to_string(),
        ));
    }

    let mut tx = db::begin_write(db).await?;

    let rental = Rental::find_by_id(&mut *tx, rental_id)
        .await?
        .ok_or(RentalError::NotFound("Rental"))?;

    let pages = match page_source {
        PageCountSource::Snapshot => rental.book_pages,
        PageCountSource::Current => {
            Book::find_by_id(&mut *tx, rental.book_id)
                .await?
                .ok_or(RentalError::NotFound("Book"))?
                .pages
        }
    };

    let extension = plan_extension(&rental, extra_months, pages)?;

    let written =
        Rental::apply_extension(&mut *tx, rental.id, rental.version, &extension).await?;
    if written == 0 {
        tracing::warn!(
            rental_id = rental.id,
            version = rental.version,
            "Rental extension lost a race"
        );
        return Err(RentalError::Conflict);
    }

    let updated = Rental::find_by_id(&mut *tx, rental.id)
        .await?
        .ok_or(RentalError::NotFound("Rental"))?;

    tx.commit().await?;

    tracing::info!(
        rental_id = updated.id,
        extra_months = extra_months,
        months_rented = updated.months_rented,
        total_fee = %updated.total_fee(),
        end_date = %updated.end_date,
        "Extended rental"
    );

    Ok(updated)
}

/// Compute the new state of `rental` after `extra_months` more months.
fn plan_extension(
    rental: &Rental,
    extra_months: i64,
    pages: i64,
) -> Result<RentalExtension, RentalError> {
    let too_long = || RentalError::Invalid("Extension is too long".to_string());

    let months_rented = rental
        .months_rented
        .checked_add(extra_months)
        .ok_or_else(too_long)?;

    let end_date = extra_months
        .checked_mul(DAYS_PER_MONTH)
        .and_then(Duration::try_days)
        .and_then(|days| rental.end_date.checked_add_signed(days))
        .ok_or_else(too_long)?;

    let (monthly_fee_cents, total_fee_cents) = fees::calculate(months_rented, pages)
        .to_cents()
        .ok_or_else(too_long)?;

    Ok(RentalExtension {
        months_rented,
        monthly_fee_cents,
        total_fee_cents,
        end_date,
    })
}
