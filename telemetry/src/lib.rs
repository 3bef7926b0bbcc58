//! Tracing setup shared by the workspace binaries and tests.

pub mod tracing;

pub use crate::tracing::{init_test_tracing, init_tracing};
