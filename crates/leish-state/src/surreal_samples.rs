//! SurrealDB-backed SamplesRepository implementation
//!
//! Uses `schema::SampleRecord` for persistence, converting to/from domain
//! images at the boundary.

use async_trait::async_trait;
use leish_domain::{ImageSample, SampleKey};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::SampleRecord;
use crate::storage_traits::{SamplesRepository, StorageResult};

/// SurrealDB-backed implementation of [`SamplesRepository`].
#[derive(Clone)]
pub struct SurrealSamplesRepository {
    db: Surreal<Any>,
}

impl SurrealSamplesRepository {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect(&StoreConfig::Memory).await
    }

    /// Open the store described by `config` and initialize the schema.
    #[instrument(skip_all, fields(url = %config.url()))]
    pub async fn connect(config: &StoreConfig) -> crate::Result<Self> {
        if let StoreConfig::Local { path } = config {
            std::fs::create_dir_all(path).map_err(|e| {
                StateError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        let url = config.url();
        let db = surrealdb::engine::any::connect(&url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        if let StoreConfig::Remote {
            username,
            password,
            namespace,
            database,
            is_root,
            ..
        } = config
        {
            if *is_root {
                db.signin(Root { username, password })
                    .await
                    .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
            } else {
                db.signin(Database {
                    namespace,
                    database,
                    username,
                    password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
            }
        }

        let (ns, database) = config.scope();
        db.use_ns(ns)
            .use_db(database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealSamplesRepository connected");
        Ok(Self { db })
    }

    /// Underlying connection.
    pub fn db(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Create from environment variables (see [`StoreConfig::from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        Self::connect(&StoreConfig::from_env()).await
    }
}

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl SamplesRepository for SurrealSamplesRepository {
    async fn find(&self, key: &SampleKey) -> StorageResult<Option<ImageSample>> {
        let mut res = self
            .db
            .query("SELECT * FROM type::thing('samples', [$diagnosis, $sample])")
            .bind(("diagnosis", key.diagnosis.to_string()))
            .bind(("sample", key.sample))
            .await
            .map_err(backend)?;

        let rows: Vec<SampleRecord> = res.take(0).map_err(backend)?;
        rows.into_iter().next().map(SampleRecord::into_sample).transpose()
    }

    async fn upsert(&self, sample: &ImageSample) -> StorageResult<()> {
        let key = sample.key();
        let row = SampleRecord::from_sample(sample)?;

        debug!(sample = %key, stage = %sample.stage, "upserting sample");

        self.db
            .query("UPSERT type::thing('samples', [$diagnosis, $sample]) CONTENT $row")
            .bind(("diagnosis", key.diagnosis.to_string()))
            .bind(("sample", key.sample))
            .bind(("row", row))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;

        Ok(())
    }

    async fn list_for_diagnosis(&self, diagnosis: Uuid) -> StorageResult<Vec<ImageSample>> {
        let mut res = self
            .db
            .query("SELECT * FROM samples WHERE diagnosis = $diagnosis ORDER BY sample ASC")
            .bind(("diagnosis", diagnosis.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<SampleRecord> = res.take(0).map_err(backend)?;
        rows.into_iter().map(SampleRecord::into_sample).collect()
    }

    async fn delete(&self, key: &SampleKey) -> StorageResult<()> {
        self.db
            .query("DELETE type::thing('samples', [$diagnosis, $sample])")
            .bind(("diagnosis", key.diagnosis.to_string()))
            .bind(("sample", key.sample))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;

        Ok(())
    }
}
