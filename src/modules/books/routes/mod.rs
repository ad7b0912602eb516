use axum::{routing::get, Router};

use super::handlers::{self, BooksState};

/// Static route table for the books module, relative to its mount point.
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route(
            "/{id}",
            get(handlers::read)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .with_state(state)
}
