//! Core domain types for migration planning.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header row of the batch recommendations table.
pub const RECOMMENDATION_HEADER: [&str; 5] = [
    "App-id",
    "Top 3 Recommended Migration Patterns",
    "Justification",
    "Potential AWS Architecture",
    "Approximate Cost",
];

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 identifying one planner invocation (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MigrationStrategy
// ---------------------------------------------------------------------------

/// Application modernization approach guiding a plan.
///
/// Parsing never fails: names outside the six known patterns are kept verbatim
/// as [`MigrationStrategy::Other`], since single-plan requests accept free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MigrationStrategy {
    Retain,
    Retire,
    Rehost,
    Replatform,
    Repurchase,
    Refactor,
    Other(String),
}

impl MigrationStrategy {
    /// The fixed vocabulary offered to the model in batch mode, in prompt order.
    pub const PATTERNS: [MigrationStrategy; 6] = [
        Self::Retain,
        Self::Retire,
        Self::Rehost,
        Self::Replatform,
        Self::Repurchase,
        Self::Refactor,
    ];

    /// Display name as used in prompts and queries.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Retain => "Retain",
            Self::Retire => "Retire",
            Self::Rehost => "Rehost",
            Self::Replatform => "Replatform",
            Self::Repurchase => "Repurchase",
            Self::Refactor => "Refactor",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for MigrationStrategy {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let known = Self::PATTERNS
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed));
        Ok(known.unwrap_or_else(|| Self::Other(trimmed.to_string())))
    }
}

impl fmt::Display for MigrationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// KnowledgeSource / ContextBundle
// ---------------------------------------------------------------------------

/// The independent knowledge sources consulted for every application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSource {
    /// Application inventory: architecture, servers, databases, dependencies.
    AppProfile,
    /// Migration best-practice documentation.
    BestPractices,
    /// Migration assessment questionnaire answers.
    QandA,
}

impl KnowledgeSource {
    /// Fixed query order used by the context aggregator.
    pub const ORDER: [KnowledgeSource; 3] = [Self::AppProfile, Self::BestPractices, Self::QandA];

    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppProfile => "app_profile",
            Self::BestPractices => "best_practices",
            Self::QandA => "qanda",
        }
    }
}

impl fmt::Display for KnowledgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieved facts about one application, one fragment per knowledge source.
///
/// Every fragment is always present; a source that returned nothing or failed
/// contributes an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBundle {
    pub app_id: String,
    /// Set in single-plan mode; batch mode asks the model to choose.
    pub strategy: Option<MigrationStrategy>,
    pub app_profile: String,
    pub best_practices: String,
    pub qanda: String,
}

impl ContextBundle {
    /// Fragment retrieved from `source`.
    pub fn fragment(&self, source: KnowledgeSource) -> &str {
        match source {
            KnowledgeSource::AppProfile => &self.app_profile,
            KnowledgeSource::BestPractices => &self.best_practices,
            KnowledgeSource::QandA => &self.qanda,
        }
    }

    /// Mutable slot for `source`.
    pub fn fragment_mut(&mut self, source: KnowledgeSource) -> &mut String {
        match source {
            KnowledgeSource::AppProfile => &mut self.app_profile,
            KnowledgeSource::BestPractices => &mut self.best_practices,
            KnowledgeSource::QandA => &mut self.qanda,
        }
    }

    /// Number of sources that produced any text.
    pub fn populated_sources(&self) -> usize {
        KnowledgeSource::ORDER
            .iter()
            .filter(|s| !self.fragment(**s).is_empty())
            .count()
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// A fully built prompt plus model selection. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    model_id: String,
    max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model_id: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            model_id: model_id.into(),
            max_tokens,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

// ---------------------------------------------------------------------------
// RecommendationRecord / RecommendationTable
// ---------------------------------------------------------------------------

/// One row of the batch output: an application and its four parsed sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationRecord {
    app_id: String,
    patterns: String,
    justification: String,
    architecture: String,
    cost: String,
}

impl RecommendationRecord {
    /// Build a record; every section is trimmed on the way in.
    pub fn new(
        app_id: impl Into<String>,
        patterns: &str,
        justification: &str,
        architecture: &str,
        cost: &str,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            patterns: patterns.trim().to_string(),
            justification: justification.trim().to_string(),
            architecture: architecture.trim().to_string(),
            cost: cost.trim().to_string(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn patterns(&self) -> &str {
        &self.patterns
    }

    pub fn justification(&self) -> &str {
        &self.justification
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn cost(&self) -> &str {
        &self.cost
    }

    /// Cells in [`RECOMMENDATION_HEADER`] order.
    pub fn cells(&self) -> [&str; 5] {
        [
            &self.app_id,
            &self.patterns,
            &self.justification,
            &self.architecture,
            &self.cost,
        ]
    }
}

/// Append-only table of recommendation rows, in application input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationTable {
    rows: Vec<RecommendationRecord>,
}

impl RecommendationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: RecommendationRecord) {
        self.rows.push(record);
    }

    pub fn rows(&self) -> &[RecommendationRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<RecommendationRecord> for RecommendationTable {
    fn from_iter<I: IntoIterator<Item = RecommendationRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputArtifact
// ---------------------------------------------------------------------------

/// What a pipeline hands to the artifact writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputArtifact {
    /// Single-plan mode: the generated plan as plain text.
    Text(String),
    /// Batch mode: one row per application.
    Table(RecommendationTable),
}
