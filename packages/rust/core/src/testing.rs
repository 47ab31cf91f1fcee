//! In-memory fakes for the client traits.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use migrationplanner_artifacts::ArtifactStore;
use migrationplanner_generation::TextModel;
use migrationplanner_retrieval::{KnowledgeBase, KnowledgeBaseIds};
use migrationplanner_shared::{AppConfig, GenerationRequest, PlannerError, Result};

use crate::Planner;

pub const RECOMMENDATION: &str = "Here is my analysis.\n\
    1. Top 3 Recommended Migration Patterns:\n\
    Rehost-60%, Replatform-30%, Retain-10%\n\
    2. Justification:\n\
    Stable workload.\n\
    3. Potential AWS Architecture:\n\
    EC2 behind an ALB.\n\
    4. Cost Breakdown and Total Cost for each Migration Pattern:\n\
    About $900/month.";

/// Answers every query with `"<kb id>: <first line of query>"`, or fails for
/// ids listed in `failing`. Records each query.
#[derive(Default)]
pub struct FakeKb {
    pub failing: Vec<&'static str>,
    pub queries: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl KnowledgeBase for FakeKb {
    async fn retrieve_and_generate(&self, id: &str, query: &str) -> Result<String> {
        self.queries
            .lock()
            .unwrap()
            .push((id.to_string(), query.to_string()));
        if self.failing.iter().any(|f| *f == id) {
            return Err(PlannerError::Retrieval(format!("{id}: unavailable")));
        }
        Ok(format!("{id} fragment"))
    }
}

/// Returns `reply` for every prompt, except prompts about an application in
/// `fail_for`, which fail with a generation error. Records each prompt and
/// its token limit.
pub struct FakeModel {
    pub reply: String,
    pub fail_for: Vec<&'static str>,
    pub prompts: Mutex<Vec<String>>,
    pub max_tokens: Mutex<Vec<u32>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_for: Vec::new(),
            prompts: Mutex::new(Vec::new()),
            max_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, app_ids: &[&'static str]) -> Self {
        self.fail_for = app_ids.to_vec();
        self
    }
}

#[async_trait]
impl TextModel for FakeModel {
    async fn invoke(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = request.prompt().to_string();
        self.prompts.lock().unwrap().push(prompt.clone());
        self.max_tokens.lock().unwrap().push(request.max_tokens());
        let failing = self
            .fail_for
            .iter()
            .any(|id| prompt.contains(&format!("application ID {id} ")));
        if failing {
            return Err(PlannerError::Generation("ThrottlingException".into()));
        }
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<Vec<(String, Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }

    pub fn body(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _, _)| k == key)
            .map(|(_, body, _)| String::from_utf8_lossy(body).into_owned())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), body, content_type.to_string()));
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("mem://{key}")
    }
}

pub fn ids() -> KnowledgeBaseIds {
    KnowledgeBaseIds {
        app_profile: "KB-APP".into(),
        best_practices: "KB-BP".into(),
        qanda: "KB-QA".into(),
    }
}

pub struct Harness {
    pub planner: Planner,
    pub kb: Arc<FakeKb>,
    pub model: Arc<FakeModel>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(kb: FakeKb, model: FakeModel) -> Harness {
    harness_with_config(&AppConfig::default(), kb, model)
}

pub fn harness_with_config(config: &AppConfig, kb: FakeKb, model: FakeModel) -> Harness {
    let kb = Arc::new(kb);
    let model = Arc::new(model);
    let store = Arc::new(MemoryStore::default());
    let planner = Planner::new(config, ids(), kb.clone(), model.clone(), store.clone());
    Harness {
        planner,
        kb,
        model,
        store,
    }
}
