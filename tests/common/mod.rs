//! Common test utilities for redshift-unload integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use fixtures::*;
