//! # Publisher
//!
//! Turns due notes into broker messages on a fixed period.
//!
//! - [`DueNoteFetcher`]: where due notes come from (local store or the
//!   remote notes service)
//! - [`Publisher`]: one fetch-encode-send cycle with per-note outcomes
//! - [`PublishLoop`]: the periodic driver with bounded shutdown

pub mod error;
pub mod fetcher;
pub mod publisher;
pub mod runner;
pub mod telemetry;

pub use error::PublisherError;
pub use fetcher::{DueNoteFetcher, LocalFetcher, RemoteFetcher};
pub use publisher::{CycleReport, DeliveryStatus, NoteOutcome, Publisher};
pub use runner::{LoopExit, LoopSettings, PublishLoop};
pub use telemetry::PublishTelemetry;
