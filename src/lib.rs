pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod model;
pub mod storage;
pub mod test_utils;
pub mod tx;

pub use error::{AtticError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
