//! Single-plan workflow: one application, one strategy, one text artifact.

use std::time::Instant;

use tracing::{info, instrument};

use migrationplanner_artifacts::ArtifactMeta;
use migrationplanner_shared::{MigrationStrategy, OutputArtifact, PlannerError, Result};

use crate::Planner;
use crate::prompt;

/// Retrieve context for `app_id`, generate a migration plan under `strategy`
/// and write it to `{prefix}/{app_id}_migration_plan.txt`.
///
/// Knowledge base failures only thin out the prompt. A generation or storage
/// failure is returned and nothing is written.
#[instrument(skip_all, fields(app_id = %app_id, strategy = %strategy))]
pub async fn generate_plan(
    planner: &Planner,
    app_id: &str,
    strategy: &MigrationStrategy,
) -> Result<ArtifactMeta> {
    let app_id = app_id.trim();
    if app_id.is_empty() {
        return Err(PlannerError::validation("app_id must not be empty"));
    }

    let start = Instant::now();
    let bundle = planner.aggregator().gather(app_id, Some(strategy)).await;
    let request = planner.request(prompt::plan_prompt(&bundle, strategy));

    let plan = planner.model().invoke(&request).await?;
    let meta = planner
        .writer()
        .write(app_id, &OutputArtifact::Text(plan))
        .await?;

    info!(
        key = %meta.key,
        sources = bundle.populated_sources(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "migration plan written"
    );
    Ok(meta)
}
