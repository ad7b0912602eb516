//! Router builder for the bookshelf HTTP server

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{Timestamp, Uuid};

use bookshelf_kernel::ModuleRegistry;

/// Versioned prefix every module is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Path serving the merged OpenAPI document
pub const OPENAPI_PATH: &str = "/docs/openapi.json";

/// Builder for constructing the main HTTP router.
///
/// Middleware only wraps routes that exist when it is added, so register
/// routes and modules before calling the `with_*` layer methods.
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `/api/v1/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        self.router = self.router.nest(&module_path(module_name), module_router);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Tag each request with a UUIDv7 `x-request-id` and echo it on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_millis(timeout_ms),
            ));
        self
    }

    /// Serve the OpenAPI document merged from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let document = openapi_document(registry);
        self.router = self.router.route(
            OPENAPI_PATH,
            get(move || async move { axum::Json(document.clone()) }),
        );
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn module_path(module_name: &str) -> String {
    format!("{}/{}", API_PREFIX, module_name)
}

/// Merge every module's OpenAPI fragment into one document.
///
/// Module paths are rebased onto the module mount point; a module's `/`
/// becomes the bare mount point.
pub fn openapi_document(registry: &ModuleRegistry) -> serde_json::Value {
    let mut spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Bookshelf API",
            "version": "1.0.0",
            "description": "CRUD service for the book resource"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    spec["components"]["schemas"]["Error"] = serde_json::json!({
        "type": "object",
        "properties": {
            "error": { "type": "string" }
        },
        "required": ["error"]
    });
    spec["components"]["schemas"]["Errors"] = serde_json::json!({
        "type": "object",
        "properties": {
            "errors": {
                "type": "array",
                "items": { "$ref": "#/components/schemas/Error" }
            }
        },
        "required": ["errors"]
    });

    spec["paths"]["/health"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "tags": ["Health"],
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": {
                            "schema": { "type": "string" }
                        }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(fragment) = module.openapi() else {
            continue;
        };

        if let Some(paths) = fragment.get("paths").and_then(|p| p.as_object()) {
            let base = module_path(module.name());
            for (path, item) in paths {
                let full = if path == "/" {
                    base.clone()
                } else {
                    format!("{}{}", base, path)
                };
                spec["paths"][full] = item.clone();
            }
        }

        if let Some(schemas) = fragment
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (name, schema) in schemas {
                spec["components"]["schemas"][name] = schema.clone();
            }
        }
    }

    // Round-trip through the typed model so only well-formed documents are served.
    match serde_json::from_value::<utoipa::openapi::OpenApi>(spec.clone()) {
        Ok(typed) => serde_json::to_value(typed).unwrap_or(spec),
        Err(err) => {
            tracing::warn!(error = %err, "merged OpenAPI document does not parse; serving it as-is");
            spec
        }
    }
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}
