//! Merges the three knowledge sources into one labelled context bundle.

use tracing::{debug, instrument};

use migrationplanner_shared::config::{ENV_KB_APP_PROFILE, ENV_KB_BEST_PRACTICES, ENV_KB_QANDA};
use migrationplanner_shared::{
    ContextBundle, KnowledgeSource, MigrationStrategy, Result, ServiceEnv, require_var,
};

use crate::queries;
use crate::retriever::Retriever;

/// Knowledge base identifier for each source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseIds {
    pub app_profile: String,
    pub best_practices: String,
    pub qanda: String,
}

impl KnowledgeBaseIds {
    pub fn id_for(&self, source: KnowledgeSource) -> &str {
        match source {
            KnowledgeSource::AppProfile => &self.app_profile,
            KnowledgeSource::BestPractices => &self.best_practices,
            KnowledgeSource::QandA => &self.qanda,
        }
    }

    /// Read only the three knowledge base ids, for runs that do not write to S3.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            app_profile: require_var(&lookup, ENV_KB_APP_PROFILE)?,
            best_practices: require_var(&lookup, ENV_KB_BEST_PRACTICES)?,
            qanda: require_var(&lookup, ENV_KB_QANDA)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

impl From<&ServiceEnv> for KnowledgeBaseIds {
    fn from(env: &ServiceEnv) -> Self {
        Self {
            app_profile: env.kb_app_profile.clone(),
            best_practices: env.kb_best_practices.clone(),
            qanda: env.kb_qanda.clone(),
        }
    }
}

/// Gathers the application-profile, best-practice and Q&A fragments for an
/// application. Each source is queried on its own; one failing source leaves
/// its fragment empty and does not affect the others.
#[derive(Clone)]
pub struct ContextAggregator {
    retriever: Retriever,
    ids: KnowledgeBaseIds,
}

impl ContextAggregator {
    pub fn new(retriever: Retriever, ids: KnowledgeBaseIds) -> Self {
        Self { retriever, ids }
    }

    /// Query all three sources, in fixed order, for `app_id`.
    ///
    /// With a strategy the questions are narrowed to it (single-plan mode).
    #[instrument(skip_all, fields(app_id = %app_id, strategy = ?strategy))]
    pub async fn gather(&self, app_id: &str, strategy: Option<&MigrationStrategy>) -> ContextBundle {
        let mut bundle = ContextBundle {
            app_id: app_id.to_string(),
            strategy: strategy.cloned(),
            ..Default::default()
        };

        for source in KnowledgeSource::ORDER {
            *bundle.fragment_mut(source) = self.fetch(source, app_id, strategy).await;
        }

        debug!(populated = bundle.populated_sources(), "context gathered");
        bundle
    }

    /// Answer to the best-practice question alone. It does not depend on the
    /// application, so a batch fetches it once.
    pub async fn best_practices(&self, strategy: Option<&MigrationStrategy>) -> String {
        let query = queries::best_practices_query(strategy);
        self.retriever
            .retrieve(
                KnowledgeSource::BestPractices,
                self.ids.id_for(KnowledgeSource::BestPractices),
                &query,
            )
            .await
            .into_text()
    }

    /// Batch-mode gather reusing an already fetched best-practice fragment.
    #[instrument(skip_all, fields(app_id = %app_id))]
    pub async fn gather_with_best_practices(&self, app_id: &str, best_practices: &str) -> ContextBundle {
        let mut bundle = ContextBundle {
            app_id: app_id.to_string(),
            strategy: None,
            ..Default::default()
        };

        for source in KnowledgeSource::ORDER {
            *bundle.fragment_mut(source) = match source {
                KnowledgeSource::BestPractices => best_practices.to_string(),
                _ => self.fetch(source, app_id, None).await,
            };
        }

        debug!(populated = bundle.populated_sources(), "context gathered");
        bundle
    }

    async fn fetch(
        &self,
        source: KnowledgeSource,
        app_id: &str,
        strategy: Option<&MigrationStrategy>,
    ) -> String {
        let query = queries::query_for(source, app_id, strategy);
        self.retriever
            .retrieve(source, self.ids.id_for(source), &query)
            .await
            .into_text()
    }
}
