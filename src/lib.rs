//! Bookshelf application library
//!
//! Feature modules mounted by the HTTP server. Wiring lives in `main.rs`.

pub mod modules;

pub use modules::*;
