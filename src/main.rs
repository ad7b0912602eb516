use anyhow::Context;
use bookshelf::modules;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.address(),
        "bookshelf bootstrap starting"
    );

    let pool = bookshelf_db::connect(&settings.database)
        .await
        .context("DB connection start failure")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool.clone());

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!(modules = registry.len(), "bookshelf bootstrap complete");

    let served = bookshelf_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    pool.close().await;

    served
}
