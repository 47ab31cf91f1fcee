//! Generative model invocation.
//!
//! [`TextModel`] is the seam the pipelines call; [`BedrockTextModel`] sends an
//! Anthropic Messages request through Bedrock's `InvokeModel` API. Unlike
//! knowledge base retrieval, a failed call here is returned as
//! [`PlannerError::Generation`] so that a missing plan or recommendation is
//! never silently empty. No retries are attempted.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use migrationplanner_shared::{GenerationRequest, PlannerError, Result};

/// Turns a prompt into generated text.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Run `request` and return the generated text.
    ///
    /// A response without any content block yields `Ok("")`.
    async fn invoke(&self, request: &GenerationRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Anthropic Messages body
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: [ContentBlock<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Text { text: &'a str },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn request_body(request: &GenerationRequest, anthropic_version: &str) -> Result<Vec<u8>> {
    let body = MessagesBody {
        anthropic_version,
        max_tokens: request.max_tokens(),
        messages: [Message {
            role: "user",
            content: [ContentBlock::Text {
                text: request.prompt(),
            }],
        }],
    };
    Ok(serde_json::to_vec(&body)?)
}

/// Text of the first content block, trimmed. Empty when there is none.
fn extract_text(body: &[u8]) -> Result<String> {
    let response: MessagesResponse = serde_json::from_slice(body)
        .map_err(|e| PlannerError::Generation(format!("malformed model response: {e}")))?;

    if let Some(usage) = &response.usage {
        debug!(
            tokens_in = usage.input_tokens,
            tokens_out = usage.output_tokens,
            "model usage"
        );
    }

    Ok(response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .map(|text| text.trim().to_string())
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Bedrock client
// ---------------------------------------------------------------------------

/// Anthropic models on Amazon Bedrock via `InvokeModel`.
#[derive(Debug, Clone)]
pub struct BedrockTextModel {
    client: aws_sdk_bedrockruntime::Client,
    anthropic_version: String,
}

impl BedrockTextModel {
    pub fn new(client: aws_sdk_bedrockruntime::Client, anthropic_version: impl Into<String>) -> Self {
        Self {
            client,
            anthropic_version: anthropic_version.into(),
        }
    }

    /// Build a client from a loaded AWS SDK configuration.
    pub fn from_sdk_config(
        sdk_config: &aws_config::SdkConfig,
        anthropic_version: impl Into<String>,
    ) -> Self {
        Self::new(aws_sdk_bedrockruntime::Client::new(sdk_config), anthropic_version)
    }
}

#[async_trait]
impl TextModel for BedrockTextModel {
    #[instrument(skip_all, fields(model_id = %request.model_id(), max_tokens = request.max_tokens()))]
    async fn invoke(&self, request: &GenerationRequest) -> Result<String> {
        let payload = request_body(request, &self.anthropic_version)?;

        let output = self
            .client
            .invoke_model()
            .model_id(request.model_id())
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                PlannerError::Generation(format!(
                    "model {}: {}",
                    request.model_id(),
                    DisplayErrorContext(&e)
                ))
            })?;

        let text = extract_text(output.body().as_ref())?;
        info!(len = text.len(), "model response received");
        Ok(text)
    }
}
