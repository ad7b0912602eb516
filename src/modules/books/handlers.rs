//! Request handlers for `/api/v1/books`.
//!
//! Each handler runs parse → validate → repository → encode and turns every
//! failure into a terminal [`AppError`]. The path id is always parsed before
//! the body is decoded or the repository is called.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bookshelf_http::{validation::Validatable, AppError};
use serde::Serialize;
use uuid::Uuid;

use super::models::{BookDto, BookForm};
use super::repository::BookRepository;

const DATA_ACCESS_FAILURE: &str = "Failed to access data";
const DATA_INSERT_FAILURE: &str = "Failed to insert data";
const DATA_UPDATE_FAILURE: &str = "Failed to update data";
const DATA_REMOVE_FAILURE: &str = "Failed to remove data";
const JSON_ENCODE_FAILURE: &str = "json encode failure";
const JSON_DECODE_FAILURE: &str = "json decode failure";
const INVALID_ID: &str = "invalid url param-id";

/// Shared handler dependencies, built once at startup
#[derive(Clone)]
pub struct BooksState {
    pub repository: Arc<dyn BookRepository>,
}

impl BooksState {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(INVALID_ID))
}

/// Decode regardless of `Content-Type`; only unparsable bodies are 400s.
fn decode_form(body: &[u8]) -> Result<BookForm, AppError> {
    let form: BookForm = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "book form rejected");
        AppError::bad_request(JSON_DECODE_FAILURE)
    })?;
    form.validate().map_err(AppError::validation)?;
    Ok(form)
}

fn encode<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, AppError> {
    let body = serde_json::to_vec(value).map_err(|e| AppError::internal(JSON_ENCODE_FAILURE, e))?;
    Ok((
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response())
}

/// `GET /books`: all books; an empty table is `[]`
pub async fn list(State(state): State<BooksState>) -> Result<Response, AppError> {
    let books = state
        .repository
        .list()
        .await
        .map_err(|e| AppError::internal(DATA_ACCESS_FAILURE, e))?;

    let dtos: Vec<BookDto> = books.iter().map(|book| book.to_dto()).collect();
    encode(StatusCode::OK, &dtos)
}

/// `POST /books`: validate, assign a fresh id, persist, 201 with the stored book
pub async fn create(
    State(state): State<BooksState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let form = decode_form(&body)?;

    let book = state
        .repository
        .create(form.to_model(Uuid::new_v4()))
        .await
        .map_err(|e| AppError::internal(DATA_INSERT_FAILURE, e))?;

    tracing::info!(book_id = %book.id, "book created");
    encode(StatusCode::CREATED, &book.to_dto())
}

/// `GET /books/{id}`
pub async fn read(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;

    let book = state.repository.read(id).await.map_err(|e| {
        if e.is_not_found() {
            AppError::not_found()
        } else {
            AppError::internal(DATA_ACCESS_FAILURE, e)
        }
    })?;

    encode(StatusCode::OK, &book.to_dto())
}

/// `PUT /books/{id}`: full overwrite; the path id wins over any id in the body
pub async fn update(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let form = decode_form(&body)?;

    let rows = state
        .repository
        .update(form.to_model(id))
        .await
        .map_err(|e| AppError::internal(DATA_UPDATE_FAILURE, e))?;

    if rows == 0 {
        return Err(AppError::not_found());
    }

    tracing::info!(book_id = %id, "book updated");
    Ok(StatusCode::OK)
}

/// `DELETE /books/{id}`
pub async fn delete(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;

    let rows = state
        .repository
        .delete(id)
        .await
        .map_err(|e| AppError::internal(DATA_REMOVE_FAILURE, e))?;

    if rows == 0 {
        return Err(AppError::not_found());
    }

    tracing::info!(book_id = %id, "book deleted");
    Ok(StatusCode::OK)
}
