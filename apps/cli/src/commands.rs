//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use migrationplanner_artifacts::LocalArtifactStore;
use migrationplanner_core::action::{failure_response, handle_event, handle_event_from_env};
use migrationplanner_core::{
    BatchOptions, BatchResult, Planner, ProgressReporter, generate_plan, run_batch, split_app_ids,
};
use migrationplanner_retrieval::KnowledgeBaseIds;
use migrationplanner_shared::{
    AppConfig, FailurePolicy, MigrationStrategy, ServiceEnv, init_config, load_config,
    load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Migration planner: AWS migration plans from your application knowledge bases.
#[derive(Parser)]
#[command(
    name = "migrationplanner",
    version,
    about = "Generate AWS migration plans and migration-pattern recommendations with Amazon Bedrock.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.migrationplanner/migrationplanner.toml.
    #[arg(long, global = true, env = "MIGRATIONPLANNER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Handle a Bedrock agent action-group event and print the response.
    Invoke {
        /// Event JSON file, or `-` for stdin.
        #[arg(long)]
        event: String,

        /// Write artifacts under this directory instead of S3.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Generate a migration plan for one application.
    Plan {
        /// Application identifier.
        #[arg(long)]
        app_id: String,

        /// Migration strategy, e.g. Rehost or Replatform.
        #[arg(long)]
        strategy: String,

        /// Write the plan under this directory instead of S3.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Recommend migration patterns for several applications as one CSV.
    Batch {
        /// Comma-separated application identifiers.
        #[arg(long)]
        app_ids: String,

        /// Applications processed at once (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,

        /// Record failed applications in the table instead of aborting.
        #[arg(long)]
        keep_going: bool,

        /// Write the table under this directory instead of S3.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "migrationplanner=info",
        1 => "migrationplanner=debug",
        _ => "migrationplanner=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `invoke` output stays parseable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Invoke { event, out_dir } => {
            cmd_invoke(config_path.as_deref(), &event, out_dir.as_deref()).await
        }
        Command::Plan {
            app_id,
            strategy,
            out_dir,
        } => cmd_plan(config_path.as_deref(), &app_id, &strategy, out_dir.as_deref()).await,
        Command::Batch {
            app_ids,
            concurrency,
            keep_going,
            out_dir,
        } => {
            cmd_batch(
                config_path.as_deref(),
                &app_ids,
                concurrency,
                keep_going,
                out_dir.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// AWS-backed planner writing to S3, or to `out_dir` when given. Local output
/// does not need `S3_BUCKET`.
async fn build_planner(config: &AppConfig, out_dir: Option<&Path>) -> Result<Planner> {
    match out_dir {
        Some(dir) => {
            let ids = KnowledgeBaseIds::from_env()?;
            let store = Arc::new(LocalArtifactStore::new(dir));
            Ok(Planner::from_aws_with_store(config, ids, store).await)
        }
        None => {
            let env = ServiceEnv::from_env()?;
            Ok(Planner::from_aws(config, &env).await)
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_invoke(config_path: Option<&Path>, event: &str, out_dir: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;

    let raw = if event == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(event).wrap_err_with(|| format!("failed to read event {event}"))?
    };
    let event: serde_json::Value =
        serde_json::from_str(&raw).wrap_err("event is not valid JSON")?;

    info!(local = out_dir.is_some(), "invoking action group handler");

    let response = match out_dir {
        None => handle_event_from_env(&config, event).await,
        Some(dir) => match KnowledgeBaseIds::from_env() {
            Ok(ids) => {
                let store = Arc::new(LocalArtifactStore::new(dir));
                let planner = Planner::from_aws_with_store(&config, ids, store).await;
                handle_event(&planner, event).await
            }
            Err(e) => failure_response(&e),
        },
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn cmd_plan(
    config_path: Option<&Path>,
    app_id: &str,
    strategy: &str,
    out_dir: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let planner = build_planner(&config, out_dir).await?;
    let strategy: MigrationStrategy = strategy.parse()?;

    info!(app_id, %strategy, "generating migration plan");

    let spinner = spinner();
    spinner.set_message(format!("Planning {app_id} ({strategy})"));
    let result = generate_plan(&planner, app_id, &strategy).await;
    spinner.finish_and_clear();
    let meta = result?;

    println!();
    println!("  Migration plan written!");
    println!("  App:      {app_id}");
    println!("  Strategy: {strategy}");
    println!("  Location: {}", meta.location);
    println!("  Size:     {} bytes", meta.size_bytes);
    println!("  SHA-256:  {}", meta.sha256);
    println!();

    Ok(())
}

async fn cmd_batch(
    config_path: Option<&Path>,
    app_ids: &str,
    concurrency: Option<usize>,
    keep_going: bool,
    out_dir: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;

    let ids = split_app_ids(app_ids);
    if ids.is_empty() {
        return Err(eyre!("--app-ids must name at least one application"));
    }

    let planner = build_planner(&config, out_dir).await?;

    let mut options = planner.batch_options();
    if let Some(n) = concurrency {
        options.concurrency = n;
    }
    if keep_going {
        options.failure_policy = FailurePolicy::MarkFailed;
    }

    info!(apps = ids.len(), ?options, "running batch");

    let reporter = CliProgress::new();
    let result = run_batch(&planner, &ids, &options, &reporter).await;
    reporter.spinner.finish_and_clear();
    let result = result?;

    print_batch_summary(&result, &options);
    Ok(())
}

fn print_batch_summary(result: &BatchResult, options: &BatchOptions) {
    println!();
    println!("  Recommendations written!");
    println!("  Rows:     {}", result.table.len());
    println!("  Failed:   {}", result.failed.len());
    println!("  Location: {}", result.artifact.location);
    println!("  Workers:  {}", options.workers(result.table.len()));
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    for failed in &result.failed {
        println!("    {}: {}", failed.app_id, failed.error);
    }
    println!();
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self { spinner: spinner() }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn app_finished(&self, app_id: &str, current: usize, total: usize, ok: bool) {
        let status = if ok { "done" } else { "failed" };
        self.spinner
            .set_message(format!("Recommendations [{current}/{total}] {app_id} {status}"));
    }

    fn done(&self, _result: &BatchResult) {
        self.spinner.finish_and_clear();
    }
}
