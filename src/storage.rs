// ABOUTME: SeaORM-backed storage layer shared by the account, profile, pet and photo services
// ABOUTME: Owns the database connection, runs migrations and holds the blob store

use std::sync::Arc;

use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::blob_store::{BlobStore, FsBlobStore};
use crate::config::Config;
use crate::error::Result;
use crate::migration::Migrator;

pub struct Storage {
    pub db: DatabaseConnection,
    pub blobs: Arc<dyn BlobStore>,
}

impl Storage {
    pub async fn new(config: &Config) -> Result<Self> {
        tracing::info!(url = %config.database_url, "Connecting to database");
        let db = Database::connect(&config.database_url).await?;
        Migrator::up(&db, None).await?;

        let blobs = Arc::new(FsBlobStore::new(&config.media_dir).await?);

        Ok(Self::with_parts(db, blobs))
    }

    pub fn with_parts(db: DatabaseConnection, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    /// Best-effort cleanup once the rows referencing the blobs are gone.
    pub(crate) async fn discard_blobs<I>(&self, references: I)
    where
        I: IntoIterator<Item = String>,
    {
        for reference in references {
            if let Err(err) = self.blobs.remove(&reference).await {
                tracing::warn!(%reference, error = %err, "Failed to remove photo blob");
            }
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
