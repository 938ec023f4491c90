//! # Storage Layer
//!
//! Note store backends: PostgreSQL for deployments and an in-memory store
//! for tests and local runs.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryNoteStore;
pub use postgres::{PoolSettings, PostgresNoteStore};
