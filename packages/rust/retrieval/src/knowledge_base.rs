//! Knowledge base client seam and its Amazon Bedrock implementation.

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::error::DisplayErrorContext;
use aws_sdk_bedrockagentruntime::types::{
    KnowledgeBaseRetrieveAndGenerateConfiguration, RetrieveAndGenerateConfiguration,
    RetrieveAndGenerateInput, RetrieveAndGenerateType,
};
use tracing::{debug, instrument};

use migrationplanner_shared::{PlannerError, Result};

/// A queryable corpus that answers natural-language questions with text.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Ask `query` against the knowledge base `knowledge_base_id` and return the
    /// generated answer text.
    async fn retrieve_and_generate(&self, knowledge_base_id: &str, query: &str) -> Result<String>;
}

/// Bedrock knowledge bases via the agent runtime `RetrieveAndGenerate` API.
#[derive(Debug, Clone)]
pub struct BedrockKnowledgeBase {
    client: aws_sdk_bedrockagentruntime::Client,
    model_arn: String,
}

impl BedrockKnowledgeBase {
    /// Wrap an existing client. `model_arn` is the model the knowledge base
    /// uses to phrase its answers.
    pub fn new(client: aws_sdk_bedrockagentruntime::Client, model_arn: impl Into<String>) -> Self {
        Self {
            client,
            model_arn: model_arn.into(),
        }
    }

    /// Build a client from a loaded AWS SDK configuration.
    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, model_arn: impl Into<String>) -> Self {
        Self::new(aws_sdk_bedrockagentruntime::Client::new(sdk_config), model_arn)
    }
}

#[async_trait]
impl KnowledgeBase for BedrockKnowledgeBase {
    #[instrument(skip_all, fields(knowledge_base_id = %knowledge_base_id))]
    async fn retrieve_and_generate(&self, knowledge_base_id: &str, query: &str) -> Result<String> {
        let build_err =
            |e: aws_sdk_bedrockagentruntime::error::BuildError| PlannerError::Retrieval(e.to_string());

        let input = RetrieveAndGenerateInput::builder()
            .text(query)
            .build()
            .map_err(build_err)?;

        let kb_config = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
            .knowledge_base_id(knowledge_base_id)
            .model_arn(&self.model_arn)
            .build()
            .map_err(build_err)?;

        let config = RetrieveAndGenerateConfiguration::builder()
            .r#type(RetrieveAndGenerateType::KnowledgeBase)
            .knowledge_base_configuration(kb_config)
            .build()
            .map_err(build_err)?;

        let response = self
            .client
            .retrieve_and_generate()
            .input(input)
            .retrieve_and_generate_configuration(config)
            .send()
            .await
            .map_err(|e| {
                PlannerError::Retrieval(format!(
                    "knowledge base {knowledge_base_id}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let text = response
            .output()
            .map(|output| output.text().to_string())
            .ok_or_else(|| {
                PlannerError::Retrieval(format!(
                    "knowledge base {knowledge_base_id}: response has no output"
                ))
            })?;

        debug!(len = text.len(), "knowledge base answered");
        Ok(text)
    }
}
