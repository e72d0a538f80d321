//! Integration test suite entry point.

mod cli_tests;
mod degraded_tests;
mod fixture;
mod lifecycle_tests;
mod recycle_bin_tests;
mod sqlite_tests;
