//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{extract::Request, routing::get, Router, ServiceExt};
use tokio::signal;
use tower_http::normalize_path::NormalizePath;

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod router;
pub mod validation;

pub use error::AppError;
use router::RouterBuilder;

/// Liveness probe path, outside the versioned API prefix
pub const HEALTH_PATH: &str = "/health";

/// Start the HTTP server and serve until SIGINT/SIGTERM
pub async fn start_server(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    if registry.is_empty() {
        tracing::warn!("no modules registered; only {} will be served", HEALTH_PATH);
    }

    let app = build_app(registry, settings);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Application service: the router behind trailing-slash normalization.
///
/// Normalization has to run before routing, so it wraps the router rather
/// than being one of its layers.
pub type App = NormalizePath<Router>;

pub fn build_app(registry: &ModuleRegistry, settings: &Settings) -> App {
    NormalizePath::trim_trailing_slash(build_router(registry, settings))
}

/// Build the main HTTP router with the health probe and all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let mut router_builder = RouterBuilder::new().route(HEALTH_PATH, get(health_check));

    for module in registry.modules() {
        tracing::info!(
            module = module.name(),
            "mounting module routes under {}/{}",
            router::API_PREFIX,
            module.name()
        );
        router_builder = router_builder.mount_module(module.name(), module.routes());
    }

    router_builder
        .with_openapi(registry)
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .build()
}

/// Health check endpoint; never touches dependencies
async fn health_check() -> &'static str {
    "Server is healthy"
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, draining requests"),
        _ = terminate => tracing::info!("received SIGTERM, draining requests"),
    }
}
