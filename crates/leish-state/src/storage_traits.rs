//! Storage trait definitions for image samples
//!
//! `SamplesRepository` is the one storage abstraction the analysis pipeline
//! needs. It is async and backend-agnostic; an in-memory fake lives in the
//! `fakes` module.

use async_trait::async_trait;
use leish_domain::{ImageSample, SampleKey};
use uuid::Uuid;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistent store of image samples keyed by `(diagnosis, sample)`.
///
/// Guarantees:
/// - `upsert(s)` replaces the whole row for `s.key()` atomically; the last
///   write for a key wins.
/// - `find(k)` returns exactly what the last `upsert` for `k` stored.
/// - `list_for_diagnosis(d)` is ordered by sample index.
/// - `delete(k)` is a no-op when the key is absent.
#[async_trait]
pub trait SamplesRepository: Send + Sync {
    /// Look up one image. `Ok(None)` when no row exists.
    async fn find(&self, key: &SampleKey) -> StorageResult<Option<ImageSample>>;

    /// Insert or replace the row for `sample.key()`.
    async fn upsert(&self, sample: &ImageSample) -> StorageResult<()>;

    /// Every image of a diagnosis, ordered by sample index.
    async fn list_for_diagnosis(&self, diagnosis: Uuid) -> StorageResult<Vec<ImageSample>>;

    /// Remove one image.
    async fn delete(&self, key: &SampleKey) -> StorageResult<()>;
}
