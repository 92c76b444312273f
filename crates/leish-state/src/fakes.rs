//! In-memory fakes for storage traits (testing only)
//!
//! `MemorySamplesRepository` satisfies the [`SamplesRepository`] contract
//! without any external dependencies.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use leish_domain::{ImageSample, SampleKey};
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory repository backed by a `BTreeMap<SampleKey, ImageSample>`.
#[derive(Debug, Default)]
pub struct MemorySamplesRepository {
    samples: Mutex<BTreeMap<SampleKey, ImageSample>>,
}

impl MemorySamplesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `samples`.
    pub fn with_samples(samples: impl IntoIterator<Item = ImageSample>) -> Self {
        let samples = samples.into_iter().map(|s| (s.key(), s)).collect();
        Self {
            samples: Mutex::new(samples),
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<SampleKey, ImageSample>>> {
        self.samples
            .lock()
            .map_err(|e| StorageError::Backend(format!("sample map poisoned: {e}")))
    }
}

#[async_trait]
impl SamplesRepository for MemorySamplesRepository {
    async fn find(&self, key: &SampleKey) -> StorageResult<Option<ImageSample>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn upsert(&self, sample: &ImageSample) -> StorageResult<()> {
        self.lock()?.insert(sample.key(), sample.clone());
        Ok(())
    }

    async fn list_for_diagnosis(&self, diagnosis: Uuid) -> StorageResult<Vec<ImageSample>> {
        let samples = self.lock()?;
        Ok(samples
            .range(SampleKey::new(diagnosis, 0)..=SampleKey::new(diagnosis, u32::MAX))
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn delete(&self, key: &SampleKey) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
