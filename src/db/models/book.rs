//! Book models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub pages: i64,
}

impl Book {
    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        db: E,
        id: i64,
    ) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Exact, case-sensitive match on an already trimmed title
    pub async fn find_by_title<'e, E: SqliteExecutor<'e>>(
        db: E,
        title: &str,
    ) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM books WHERE title = ?")
            .bind(title)
            .fetch_optional(db)
            .await
    }

    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        db: E,
        title: &str,
        author: &str,
        pages: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO books (title, author, pages) VALUES (?, ?, ?)")
            .bind(title)
            .bind(author)
            .bind(pages)
            .execute(db)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_metadata<'e, E: SqliteExecutor<'e>>(
        db: E,
        id: i64,
        author: &str,
        pages: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE books SET author = ?, pages = ? WHERE id = ?")
            .bind(author)
            .bind(pages)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    #[tokio::test]
    async fn test_title_lookup_is_case_sensitive() {
        let db = init_in_memory().await.unwrap();
        let id = Book::insert(&db, "Dune", "Frank Herbert", 412).await.unwrap();

        let book = Book::find_by_title(&db, "Dune").await.unwrap().unwrap();
        assert_eq!(book.id, id);
        assert_eq!(book.pages, 412);
        assert!(Book::find_by_title(&db, "dune").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_metadata() {
        let db = init_in_memory().await.unwrap();
        let id = Book::insert(&db, "Emma", "Unknown", 100).await.unwrap();

        Book::update_metadata(&db, id, "Jane Austen", 474).await.unwrap();

        let book = Book::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(book.author, "Jane Austen");
        assert_eq!(book.pages, 474);
    }

    #[tokio::test]
    async fn test_non_positive_pages_rejected() {
        let db = init_in_memory().await.unwrap();
        assert!(Book::insert(&db, "Blank", "Nobody", 0).await.is_err());
    }
}
