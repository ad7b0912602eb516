pub mod books;

use std::sync::Arc;

use bookshelf_kernel::ModuleRegistry;
use sqlx::PgPool;

/// Register all application modules backed by `pool`
pub fn register_all(registry: &mut ModuleRegistry, pool: PgPool) {
    let repository = Arc::new(books::repository::PgBookRepository::new(pool));
    registry.register(books::create_module(repository));
}
