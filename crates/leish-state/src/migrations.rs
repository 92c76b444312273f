//! SurrealDB schema migrations and initialization

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Table holding one row per image sample
pub const SAMPLES_TABLE: &str = "samples";

/// Initialize every Leishmaniapp table.
///
/// Safe to call on every connection (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing leishmaniapp SurrealDB schema");
    init_samples_table(db).await?;
    info!("Leishmaniapp schema initialization complete");
    Ok(())
}

/// Initialize `samples` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE samples {
///   id:           samples:[diagnosis, sample]
///   diagnosis:    STRING (uuid, indexed)
///   sample:       INT
///   stage:        STRING (not_analyzed | analyzing | deferred | analyzed |
///                         result_error | deliver_error)
///   captured_at:  DATETIME?
///   elements:     ARRAY<OBJECT>
/// }
/// ```
///
/// The record id is derived from `(diagnosis, sample)`, so an `UPSERT` on it
/// replaces the whole row in one statement.
async fn init_samples_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing samples table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS samples
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        -- One row per (diagnosis, sample)
        DEFINE INDEX IF NOT EXISTS idx_diagnosis_sample ON TABLE samples COLUMNS diagnosis, sample UNIQUE;

        -- Listing a case
        DEFINE INDEX IF NOT EXISTS idx_diagnosis ON TABLE samples COLUMNS diagnosis;

        -- Stage filters (pending work, errors)
        DEFINE INDEX IF NOT EXISTS idx_stage ON TABLE samples COLUMNS stage;
    "#;

    db.query(sql)
        .await?
        .check()
        .map_err(|e| crate::StateError::SchemaSetup(e.to_string()))?;
    info!("samples table initialized");
    Ok(())
}
