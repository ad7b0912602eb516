//! Runs `PgBookRepository` against a live database.
//!
//! Set `BOOKSHELF_TEST_DATABASE_URL` to a disposable Postgres database to
//! enable these tests; without it they return early.

use std::path::Path;

use bookshelf::modules::books::{
    models::BookForm,
    repository::{BookRepository, PgBookRepository},
};
use bookshelf_db::migrate::MigrationRunner;
use sqlx::PgPool;
use uuid::Uuid;

const DATABASE_URL_ENV: &str = "BOOKSHELF_TEST_DATABASE_URL";

async fn repository() -> Option<PgBookRepository> {
    let Ok(url) = std::env::var(DATABASE_URL_ENV) else {
        eprintln!("{DATABASE_URL_ENV} not set; skipping");
        return None;
    };

    let pool = PgPool::connect(&url).await.unwrap();
    let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    MigrationRunner::open(&migrations, pool.clone())
        .await
        .unwrap()
        .up()
        .await
        .unwrap();

    Some(PgBookRepository::new(pool))
}

fn form(title: &str, author: &str) -> BookForm {
    BookForm {
        title: title.to_string(),
        author: author.to_string(),
    }
}

#[tokio::test]
async fn book_lifecycle_round_trips_through_postgres() {
    let Some(repo) = repository().await else {
        return;
    };

    let id = Uuid::new_v4();
    let created = repo.create(form("Dune", "Herbert").to_model(id)).await.unwrap();
    assert_eq!(created.id, id);

    let listed = repo.list().await.unwrap();
    assert!(listed.iter().any(|book| book.id == id));

    let read = repo.read(id).await.unwrap();
    assert_eq!((read.title.as_str(), read.author.as_str()), ("Dune", "Herbert"));

    let rows = repo
        .update(form("Dune Messiah", "Frank Herbert").to_model(id))
        .await
        .unwrap();
    assert_eq!(rows, 1);
    let updated = repo.read(id).await.unwrap();
    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.created_at, read.created_at);

    assert_eq!(repo.delete(id).await.unwrap(), 1);
    assert_eq!(repo.delete(id).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_rows_are_reported_without_errors() {
    let Some(repo) = repository().await else {
        return;
    };

    let id = Uuid::new_v4();
    assert!(repo.read(id).await.unwrap_err().is_not_found());
    assert_eq!(repo.update(form("Dune", "Herbert").to_model(id)).await.unwrap(), 0);
    assert_eq!(repo.delete(id).await.unwrap(), 0);
}
