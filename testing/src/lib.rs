//! Shared test fixtures for the reminder notes workspace.
//!
//! Provides single, shared instances of testcontainers across all test files:
//! - PostgreSQL (port 5432), backing the note store
//! - Redis (port 6379), backing the broker streams
//!
//! Each fixture is lazily initialized once per test process. A fixture that
//! cannot start (no Docker) resolves to `None` and the caller skips.

mod fixtures;

pub use fixtures::*;
