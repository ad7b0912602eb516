//! Persistence for books. Handlers only reach the database through [`BookRepository`].

use async_trait::async_trait;
use bookshelf_db::RepositoryResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::Book;

/// CRUD operations on the `books` table.
///
/// Every call is a single statement; none of them run in a transaction.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Every row, in no particular order
    async fn list(&self) -> RepositoryResult<Vec<Book>>;

    /// Insert `book` and return the stored row
    async fn create(&self, book: Book) -> RepositoryResult<Book>;

    /// Exactly one row, or `RepositoryError::NotFound`
    async fn read(&self, id: Uuid) -> RepositoryResult<Book>;

    /// Overwrite title, author and `updated_at` of row `book.id`; returns affected rows
    async fn update(&self, book: Book) -> RepositoryResult<u64>;

    /// Remove row `id`; returns affected rows
    async fn delete(&self, id: Uuid) -> RepositoryResult<u64>;
}

/// Postgres-backed repository using parameterized statements
#[derive(Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn list(&self) -> RepositoryResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, created_at, updated_at FROM books",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn create(&self, book: Book) -> RepositoryResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, author, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, author, created_at, updated_at
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.created_at)
        .bind(book.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn read(&self, id: Uuid) -> RepositoryResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, created_at, updated_at FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn update(&self, book: Book) -> RepositoryResult<u64> {
        let result = sqlx::query(
            "UPDATE books SET title = $2, author = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
