use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{self, Request};
use axum::response::Response;
use axum::body::Body;
use bookshelf::modules::books::{self, models::Book, repository::BookRepository};
use bookshelf_db::{RepositoryError, RepositoryResult};
use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use http_body_util::BodyExt;
use uuid::Uuid;

/// Repository over a map, counting every call it receives.
#[derive(Default)]
pub struct InMemoryBooks {
    rows: Mutex<HashMap<Uuid, Book>>,
    calls: AtomicUsize,
}

impl InMemoryBooks {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: Uuid) -> Option<Book> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookRepository for InMemoryBooks {
    async fn list(&self) -> RepositoryResult<Vec<Book>> {
        self.touch();
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn create(&self, book: Book) -> RepositoryResult<Book> {
        self.touch();
        self.rows.lock().unwrap().insert(book.id, book.clone());
        Ok(book)
    }

    async fn read(&self, id: Uuid) -> RepositoryResult<Book> {
        self.touch();
        self.get(id).ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, book: Book) -> RepositoryResult<u64> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&book.id) {
            Some(row) => {
                row.title = book.title;
                row.author = book.author;
                row.updated_at = book.updated_at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<u64> {
        self.touch();
        Ok(self.rows.lock().unwrap().remove(&id).map_or(0, |_| 1))
    }
}

/// Repository whose every call fails like a lost connection.
pub struct UnreachableBooks;

#[async_trait]
impl BookRepository for UnreachableBooks {
    async fn list(&self) -> RepositoryResult<Vec<Book>> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn create(&self, _book: Book) -> RepositoryResult<Book> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn read(&self, _id: Uuid) -> RepositoryResult<Book> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn update(&self, _book: Book) -> RepositoryResult<u64> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn delete(&self, _id: Uuid) -> RepositoryResult<u64> {
        Err(sqlx::Error::PoolTimedOut.into())
    }
}

/// Full application router over `repository`
pub fn app(repository: Arc<dyn BookRepository>) -> bookshelf_http::App {
    let mut registry = ModuleRegistry::new();
    registry.register(books::create_module(repository));
    bookshelf_http::build_app(&registry, &Settings::default())
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn raw_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
