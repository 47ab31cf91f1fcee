//! Artifact persistence for generated plans and recommendation tables.
//!
//! Pipelines hand an [`OutputArtifact`] to an [`ArtifactWriter`], which
//! renders it, derives its deterministic key, and puts it in an
//! [`ArtifactStore`]: S3 in deployment, a local directory for offline runs.

mod keys;
mod local;
mod s3;
mod table;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use migrationplanner_shared::{OutputArtifact, RecommendationTable, Result};

pub use keys::{PLAN_KEY_SUFFIX, RECOMMENDATIONS_FILE, plan_key, recommendations_key};
pub use local::LocalArtifactStore;
pub use s3::S3ArtifactStore;
pub use table::render_csv;

/// Content type of single-plan artifacts.
pub const TEXT_CONTENT_TYPE: &str = "text/plain";
/// Content type of the batch recommendations table.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Key/value object storage. Writing an existing key overwrites it.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Human-readable location of `key`, for logs and CLI output.
    fn location(&self, key: &str) -> String;
}

/// Metadata for one written artifact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactMeta {
    pub key: String,
    pub location: String,
    pub sha256: String,
    pub size_bytes: usize,
    pub written_at: DateTime<Utc>,
}

/// Renders artifacts and writes them under a common key prefix.
#[derive(Clone)]
pub struct ArtifactWriter {
    store: Arc<dyn ArtifactStore>,
    prefix: String,
}

impl ArtifactWriter {
    pub fn new(store: Arc<dyn ArtifactStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Write a generated plan to `{prefix}/{app_id}_migration_plan.txt`.
    pub async fn write_plan(&self, app_id: &str, plan: &str) -> Result<ArtifactMeta> {
        let key = plan_key(&self.prefix, app_id);
        self.put(key, plan.as_bytes().to_vec(), TEXT_CONTENT_TYPE).await
    }

    /// Write the batch table to `{prefix}/r_disposition_recommendations.csv`.
    pub async fn write_recommendations(&self, table: &RecommendationTable) -> Result<ArtifactMeta> {
        let body = render_csv(table)?;
        self.put(recommendations_key(&self.prefix), body, CSV_CONTENT_TYPE)
            .await
    }

    /// Write either kind of artifact. `app_id` names the plan file and is
    /// ignored for tables.
    pub async fn write(&self, app_id: &str, artifact: &OutputArtifact) -> Result<ArtifactMeta> {
        match artifact {
            OutputArtifact::Text(text) => self.write_plan(app_id, text).await,
            OutputArtifact::Table(table) => self.write_recommendations(table).await,
        }
    }

    #[instrument(skip_all, fields(key = %key, content_type = %content_type))]
    async fn put(&self, key: String, body: Vec<u8>, content_type: &str) -> Result<ArtifactMeta> {
        let sha256 = format!("{:x}", Sha256::digest(&body));
        let size_bytes = body.len();

        self.store.put(&key, body, content_type).await?;

        let location = self.store.location(&key);
        info!(%location, size = size_bytes, "wrote artifact");

        Ok(ArtifactMeta {
            key,
            location,
            sha256,
            size_bytes,
            written_at: Utc::now(),
        })
    }
}


#[cfg(test)]
mod tests {
    use migrationplanner_shared::RecommendationRecord;

    use super::testing::MemoryStore;
    use super::*;

    #[tokio::test]
    async fn plan_is_written_as_text_under_prefix() {
        let store = Arc::new(MemoryStore::default());
        let writer = ArtifactWriter::new(store.clone(), "R-Disposition-outputs");

        let meta = writer.write_plan("A1", "1. Introduction").await.unwrap();

        assert_eq!(meta.key, "R-Disposition-outputs/A1_migration_plan.txt");
        assert_eq!(meta.location, "mem://R-Disposition-outputs/A1_migration_plan.txt");
        assert_eq!(meta.size_bytes, "1. Introduction".len());
        assert_eq!(meta.sha256.len(), 64);

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].1, b"1. Introduction");
        assert_eq!(objects[0].2, "text/plain");
    }

    #[tokio::test]
    async fn table_is_written_as_csv() {
        let store = Arc::new(MemoryStore::default());
        let writer = ArtifactWriter::new(store.clone(), "out");
        let table: RecommendationTable = [RecommendationRecord::new("A1", "p", "j", "a", "c")]
            .into_iter()
            .collect();

        let meta = writer
            .write("ignored", &OutputArtifact::Table(table))
            .await
            .unwrap();

        assert_eq!(meta.key, "out/r_disposition_recommendations.csv");
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects[0].2, "text/csv");
        let body = String::from_utf8(objects[0].1.clone()).unwrap();
        assert!(body.starts_with("App-id,"));
        assert!(body.contains("A1,p,j,a,c"));
    }

    #[tokio::test]
    async fn identical_content_hashes_identically() {
        let writer = ArtifactWriter::new(Arc::new(MemoryStore::default()), "p");
        let a = writer.write_plan("A1", "same").await.unwrap();
        let b = writer.write_plan("A2", "same").await.unwrap();
        assert_eq!(a.sha256, b.sha256);
        assert_ne!(a.key, b.key);
    }
}
