//! Failure-contained knowledge base retrieval.

use std::sync::Arc;

use tracing::{info, warn};

use migrationplanner_shared::KnowledgeSource;

use crate::knowledge_base::KnowledgeBase;

/// Outcome of one retrieval.
///
/// Retrieval errors are recovered here and never reach the caller as `Err`;
/// a recovered retrieval contributes an empty fragment to the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    /// The knowledge base answered (possibly with empty text).
    Answered(String),
    /// The call failed; `error` is kept for logging and reporting only.
    Recovered { error: String },
}

impl Retrieval {
    /// The fragment to embed: the answer, or empty text after a failure.
    pub fn into_text(self) -> String {
        match self {
            Self::Answered(text) => text,
            Self::Recovered { .. } => String::new(),
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Queries knowledge bases, converting every failure into [`Retrieval::Recovered`].
#[derive(Clone)]
pub struct Retriever {
    knowledge_base: Arc<dyn KnowledgeBase>,
}

impl Retriever {
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>) -> Self {
        Self { knowledge_base }
    }

    /// Ask `query` against `knowledge_base_id` on behalf of `source`.
    pub async fn retrieve(
        &self,
        source: KnowledgeSource,
        knowledge_base_id: &str,
        query: &str,
    ) -> Retrieval {
        match self
            .knowledge_base
            .retrieve_and_generate(knowledge_base_id, query)
            .await
        {
            Ok(text) => {
                info!(%source, knowledge_base_id, len = text.len(), "received knowledge base answer");
                Retrieval::Answered(text)
            }
            Err(e) => {
                warn!(%source, knowledge_base_id, error = %e, "knowledge base retrieval failed, continuing without it");
                Retrieval::Recovered {
                    error: e.to_string(),
                }
            }
        }
    }
}
