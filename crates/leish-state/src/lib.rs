//! Leish-State: SurrealDB persistence for image samples
//!
//! The single store the reconciler writes into. Image rows are keyed by
//! `(diagnosis, sample)` and upserted whole, so concurrent writers resolve as
//! last-write-wins per key.
//!
//! ## Key Components
//!
//! - `SamplesRepository`: async, backend-agnostic repository trait
//! - `MemorySamplesRepository`: in-memory fake for tests
//! - `SurrealSamplesRepository`: `mem://`, `surrealkv://` or remote backend
//! - `StoreConfig`: which backend to open, usually read from the environment

mod config;
mod error;
pub mod fakes;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_samples;

pub use config::StoreConfig;
pub use error::{StateError, StorageError};
pub use schema::SampleRecord;
pub use storage_traits::{SamplesRepository, StorageResult};
pub use surreal_samples::SurrealSamplesRepository;

/// Result type for leish-state operations
pub type Result<T> = std::result::Result<T, StateError>;
