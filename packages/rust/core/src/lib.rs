//! Migration planning pipelines.
//!
//! This crate ties retrieval, prompt building, generation, section parsing and
//! artifact writing into the two end-to-end workflows ([`generate_plan`] and
//! [`run_batch`]) and exposes them to a Bedrock agent through the action-group
//! handler in [`action`].

pub mod action;
pub mod batch;
pub mod plan;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

use migrationplanner_artifacts::{ArtifactStore, ArtifactWriter, S3ArtifactStore};
use migrationplanner_generation::{BedrockTextModel, TextModel};
use migrationplanner_retrieval::{
    BedrockKnowledgeBase, ContextAggregator, KnowledgeBase, KnowledgeBaseIds, Retriever,
};
use migrationplanner_shared::{AppConfig, BatchConfig, GenerationRequest, ServiceEnv};

pub use batch::{
    BatchOptions, BatchResult, FailedApp, ProgressReporter, SilentProgress, run_batch,
    split_app_ids,
};
pub use plan::generate_plan;

/// The service clients and settings every pipeline runs against.
///
/// Cheap to clone: clients are shared behind `Arc`.
#[derive(Clone)]
pub struct Planner {
    aggregator: ContextAggregator,
    model: Arc<dyn TextModel>,
    writer: ArtifactWriter,
    model_id: String,
    max_tokens: u32,
    batch_max_tokens: u32,
    batch: BatchConfig,
}

impl Planner {
    /// Assemble a planner from explicit clients.
    pub fn new(
        config: &AppConfig,
        ids: KnowledgeBaseIds,
        knowledge_base: Arc<dyn KnowledgeBase>,
        model: Arc<dyn TextModel>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            aggregator: ContextAggregator::new(Retriever::new(knowledge_base), ids),
            model,
            writer: ArtifactWriter::new(store, config.output.prefix.clone()),
            model_id: config.bedrock.model_id.clone(),
            max_tokens: config.bedrock.max_tokens,
            batch_max_tokens: config.bedrock.batch_max_tokens,
            batch: config.batch.clone(),
        }
    }

    /// Bedrock and S3 clients built from the AWS default credential chain.
    pub async fn from_aws(config: &AppConfig, env: &ServiceEnv) -> Self {
        let sdk_config = load_sdk_config(config).await;
        let store = Arc::new(S3ArtifactStore::from_sdk_config(&sdk_config, env.bucket.clone()));
        Self::from_sdk_config(config, &sdk_config, KnowledgeBaseIds::from(env), store)
    }

    /// Bedrock clients from the AWS default credential chain, writing to `store`.
    pub async fn from_aws_with_store(
        config: &AppConfig,
        ids: KnowledgeBaseIds,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let sdk_config = load_sdk_config(config).await;
        Self::from_sdk_config(config, &sdk_config, ids, store)
    }

    fn from_sdk_config(
        config: &AppConfig,
        sdk_config: &SdkConfig,
        ids: KnowledgeBaseIds,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let knowledge_base = Arc::new(BedrockKnowledgeBase::from_sdk_config(
            sdk_config,
            config.retrieval.model_arn.clone(),
        ));
        let model = Arc::new(BedrockTextModel::from_sdk_config(
            sdk_config,
            config.bedrock.anthropic_version.clone(),
        ));
        Self::new(config, ids, knowledge_base, model, store)
    }

    /// Generation request for a migration plan prompt.
    pub fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest::new(prompt, self.model_id.as_str(), self.max_tokens)
    }

    /// Generation request for one batch recommendation prompt.
    pub fn batch_request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest::new(prompt, self.model_id.as_str(), self.batch_max_tokens)
    }

    /// Batch options from the `[batch]` config section.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::from(&self.batch)
    }

    pub(crate) fn aggregator(&self) -> &ContextAggregator {
        &self.aggregator
    }

    pub(crate) fn model(&self) -> &dyn TextModel {
        self.model.as_ref()
    }

    pub(crate) fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }
}

/// Shared AWS configuration. SDK retries are disabled: every remote call is
/// attempted exactly once.
async fn load_sdk_config(config: &AppConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());
    if let Some(region) = &config.bedrock.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;
    debug!(region = ?sdk_config.region(), "loaded AWS configuration");
    sdk_config
}
