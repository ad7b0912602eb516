pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::json;

use handlers::BooksState;
use repository::BookRepository;

/// CRUD module for the book resource
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self {
            state: BooksState::new(repository),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "description": "Book ID",
            "schema": { "type": "string", "format": "uuid" }
        });
        let form_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookForm" }
                }
            }
        });
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Error" }
                    }
                }
            })
        };
        let validation_error = json!({
            "description": "Validation failed",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Errors" }
                }
            }
        });
        let book = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create book",
                        "tags": ["Books"],
                        "requestBody": form_body.clone(),
                        "responses": {
                            "201": book("Created book"),
                            "400": error("Malformed JSON body"),
                            "422": validation_error.clone(),
                            "500": error("Internal server error")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Read book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": book("Book"),
                            "400": error("Malformed id"),
                            "404": { "description": "Not found" },
                            "500": error("Internal server error")
                        }
                    },
                    "put": {
                        "summary": "Update book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": form_body,
                        "responses": {
                            "200": { "description": "Updated" },
                            "400": error("Malformed id or JSON body"),
                            "404": { "description": "Not found" },
                            "422": validation_error,
                            "500": error("Internal server error")
                        }
                    },
                    "delete": {
                        "summary": "Delete book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "Deleted" },
                            "400": error("Malformed id"),
                            "404": { "description": "Not found" },
                            "500": error("Internal server error")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "author": { "type": "string" }
                        },
                        "required": ["id", "title", "author"]
                    },
                    "BookForm": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": models::MAX_FIELD_LENGTH },
                            "author": { "type": "string", "maxLength": models::MAX_FIELD_LENGTH }
                        },
                        "required": ["title", "author"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over `repository`
pub fn create_module(repository: Arc<dyn BookRepository>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(repository))
}
