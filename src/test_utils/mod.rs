//! Shared test utilities for attic.

pub mod fixtures;
pub mod logging;

pub use fixtures::{FaultyContentStore, FaultyDeletedContentStore, StoreFixture};
