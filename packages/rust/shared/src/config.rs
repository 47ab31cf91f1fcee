//! Application configuration for the migration planner.
//!
//! Tunables live at `~/.migrationplanner/migrationplanner.toml`. Deployment
//! specific identifiers (output bucket, knowledge base ids) come from the
//! process environment, see [`ServiceEnv`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "migrationplanner.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".migrationplanner";

/// Environment variable naming the output bucket.
pub const ENV_S3_BUCKET: &str = "S3_BUCKET";
/// Environment variable naming the application-profile knowledge base.
pub const ENV_KB_APP_PROFILE: &str = "KB_ID_MIGRATION_AGENT_INFO";
/// Environment variable naming the best-practice docs knowledge base.
pub const ENV_KB_BEST_PRACTICES: &str = "KB_ID_BP_DOCS";
/// Environment variable naming the assessment Q&A knowledge base.
pub const ENV_KB_QANDA: &str = "KB_ID_QANDA_INFO";

// ---------------------------------------------------------------------------
// Config structs (matching migrationplanner.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generative model settings.
    #[serde(default)]
    pub bedrock: BedrockConfig,

    /// Knowledge base retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Artifact output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Batch orchestration settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// `[bedrock]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockConfig {
    /// AWS region. Falls back to the SDK's default provider chain when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Model used to write plans and recommendations.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Upper bound on generated tokens for a migration plan.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on generated tokens for one batch recommendation. The
    /// model's own output ceiling (4096 tokens for Claude 3) still applies to
    /// both limits.
    #[serde(default = "default_batch_max_tokens")]
    pub batch_max_tokens: u32,

    /// Anthropic Messages API version sent in the request body.
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: None,
            model_id: default_model_id(),
            max_tokens: default_max_tokens(),
            batch_max_tokens: default_batch_max_tokens(),
            anthropic_version: default_anthropic_version(),
        }
    }
}

fn default_model_id() -> String {
    "anthropic.claude-3-sonnet-20240229-v1:0".into()
}
fn default_max_tokens() -> u32 {
    100_000
}
fn default_batch_max_tokens() -> u32 {
    10_000
}
fn default_anthropic_version() -> String {
    "bedrock-2023-05-31".into()
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Model the knowledge bases use to phrase their answers.
    #[serde(default = "default_model_arn")]
    pub model_arn: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            model_arn: default_model_arn(),
        }
    }
}

fn default_model_arn() -> String {
    "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-3-sonnet-20240229-v1:0".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Key prefix for every written artifact.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "R-Disposition-outputs".into()
}

/// What the batch orchestrator does when generation fails for one application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Fail the whole batch; nothing is written.
    #[default]
    Abort,
    /// Record the failure in the row and continue with the next application.
    MarkFailed,
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Applications processed at once. 1 means strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Behaviour on a per-application generation failure.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Service environment (runtime, from process env)
// ---------------------------------------------------------------------------

/// Deployment identifiers read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEnv {
    /// Output bucket (`S3_BUCKET`).
    pub bucket: String,
    /// Application-profile knowledge base (`KB_ID_MIGRATION_AGENT_INFO`).
    pub kb_app_profile: String,
    /// Best-practice docs knowledge base (`KB_ID_BP_DOCS`).
    pub kb_best_practices: String,
    /// Assessment Q&A knowledge base (`KB_ID_QANDA_INFO`).
    pub kb_qanda: String,
}

impl ServiceEnv {
    /// Read all identifiers from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read all identifiers through `lookup`. Missing or blank values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            bucket: require_var(&lookup, ENV_S3_BUCKET)?,
            kb_app_profile: require_var(&lookup, ENV_KB_APP_PROFILE)?,
            kb_best_practices: require_var(&lookup, ENV_KB_BEST_PRACTICES)?,
            kb_qanda: require_var(&lookup, ENV_KB_QANDA)?,
        })
    }
}

/// Trimmed value of `name` through `lookup`; unset or blank is a config error.
pub fn require_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(PlannerError::config(format!(
            "environment variable {name} is not set"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.migrationplanner/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PlannerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.migrationplanner/migrationplanner.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PlannerError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PlannerError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PlannerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| PlannerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PlannerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
