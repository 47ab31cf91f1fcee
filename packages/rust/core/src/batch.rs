//! Batch workflow: recommend migration patterns for many applications and
//! write them as one CSV table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use migrationplanner_artifacts::ArtifactMeta;
use migrationplanner_sections::parse_recommendation;
use migrationplanner_shared::{
    BatchConfig, FailurePolicy, OutputArtifact, PlannerError, RecommendationRecord,
    RecommendationTable, Result,
};

use crate::Planner;
use crate::prompt;

/// Tuning for [`run_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Applications in flight at once. Clamped to `1..=apps`, see [`Self::workers`].
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
}

impl BatchOptions {
    /// Worker count for a batch of `apps` applications.
    pub fn workers(&self, apps: usize) -> usize {
        self.concurrency.min(apps).max(1)
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            concurrency: config.concurrency as usize,
            failure_policy: config.failure_policy,
        }
    }
}

/// An application whose recommendation could not be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedApp {
    pub app_id: String,
    pub error: String,
}

/// Result of a completed batch.
#[derive(Debug)]
pub struct BatchResult {
    /// The written CSV.
    pub artifact: ArtifactMeta,
    /// Rows in input order.
    pub table: RecommendationTable,
    /// Only populated under [`FailurePolicy::MarkFailed`].
    pub failed: Vec<FailedApp>,
    pub elapsed: Duration,
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each application's row is settled, in input order.
    fn app_finished(&self, app_id: &str, current: usize, total: usize, ok: bool);
    /// Called when the batch completes.
    fn done(&self, result: &BatchResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn app_finished(&self, _app_id: &str, _current: usize, _total: usize, _ok: bool) {}
    fn done(&self, _result: &BatchResult) {}
}

/// Split a comma-separated id list. Entries are trimmed; empty entries are dropped.
pub fn split_app_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run the batch pipeline over `app_ids`, in order.
///
/// 1. Fetch best-practice guidance once for the whole batch
/// 2. Per application: gather context, prompt, generate, parse sections
/// 3. Write `{prefix}/r_disposition_recommendations.csv`
///
/// Under [`FailurePolicy::Abort`] the first generation failure is returned and
/// no table is written.
#[instrument(skip_all, fields(apps = app_ids.len(), concurrency = options.concurrency))]
pub async fn run_batch(
    planner: &Planner,
    app_ids: &[String],
    options: &BatchOptions,
    progress: &dyn ProgressReporter,
) -> Result<BatchResult> {
    if app_ids.is_empty() {
        return Err(PlannerError::validation("app_ids must name at least one application"));
    }

    let start = Instant::now();
    let total = app_ids.len();
    let workers = options.workers(total);
    info!(total, workers, "starting batch");

    progress.phase("Retrieving best practices");
    let best_practices: Arc<str> = planner.aggregator().best_practices(None).await.into();

    progress.phase("Generating recommendations");
    let mut rows = Settled::new(options.failure_policy, total, progress);
    if workers == 1 {
        sequential(planner, app_ids, &best_practices, &mut rows).await?;
    } else {
        concurrent(planner, app_ids, best_practices, workers, &mut rows).await?;
    }
    let Settled { table, failed, .. } = rows;

    progress.phase("Writing recommendations");
    let artifact = planner
        .writer()
        .write("", &OutputArtifact::Table(table.clone()))
        .await?;

    let result = BatchResult {
        artifact,
        table,
        failed,
        elapsed: start.elapsed(),
    };

    info!(
        key = %result.artifact.key,
        rows = result.table.len(),
        failed = result.failed.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "batch complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Rows settled so far, in input order.
struct Settled<'a> {
    policy: FailurePolicy,
    total: usize,
    progress: &'a dyn ProgressReporter,
    table: RecommendationTable,
    failed: Vec<FailedApp>,
}

impl<'a> Settled<'a> {
    fn new(policy: FailurePolicy, total: usize, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            policy,
            total,
            progress,
            table: RecommendationTable::new(),
            failed: Vec::new(),
        }
    }

    /// Record the outcome for the next application in input order and report
    /// it. Under `Abort` a failure is handed back.
    fn settle(&mut self, app_id: &str, outcome: Result<RecommendationRecord>) -> Result<()> {
        let current = self.table.len() + 1;
        match outcome {
            Ok(record) => {
                self.table.push(record);
                self.progress.app_finished(app_id, current, self.total, true);
                Ok(())
            }
            Err(e) => {
                self.progress.app_finished(app_id, current, self.total, false);
                match self.policy {
                    FailurePolicy::Abort => {
                        warn!(%app_id, error = %e, "aborting batch");
                        Err(e)
                    }
                    FailurePolicy::MarkFailed => {
                        warn!(%app_id, error = %e, "recording failed application");
                        self.table.push(failed_record(app_id, &e));
                        self.failed.push(FailedApp {
                            app_id: app_id.to_string(),
                            error: e.to_string(),
                        });
                        Ok(())
                    }
                }
            }
        }
    }
}

fn failed_record(app_id: &str, error: &PlannerError) -> RecommendationRecord {
    RecommendationRecord::new(app_id, &format!("generation failed: {error}"), "", "", "")
}

/// One application at a time. Under `Abort` nothing after the first failure
/// is attempted.
async fn sequential(
    planner: &Planner,
    app_ids: &[String],
    best_practices: &str,
    rows: &mut Settled<'_>,
) -> Result<()> {
    for app_id in app_ids {
        let outcome = recommend(planner, app_id, best_practices).await;
        rows.settle(app_id, outcome)?;
    }
    Ok(())
}

/// Up to `workers` applications in flight. Outcomes are settled in input
/// order regardless of completion order; an abort cancels every unsettled task.
async fn concurrent(
    planner: &Planner,
    app_ids: &[String],
    best_practices: Arc<str>,
    workers: usize,
    rows: &mut Settled<'_>,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut handles = Vec::with_capacity(app_ids.len());

    for app_id in app_ids {
        let planner = planner.clone();
        let sem = semaphore.clone();
        let app_id = app_id.clone();
        let best_practices = best_practices.clone();

        handles.push(tokio::spawn(async move {
            match sem.acquire().await {
                Ok(_permit) => recommend(&planner, &app_id, &best_practices).await,
                Err(_) => Err(PlannerError::Generation(format!("{app_id}: batch cancelled"))),
            }
        }));
    }

    let mut pending = app_ids.iter().zip(handles);
    while let Some((app_id, handle)) = pending.next() {
        let outcome = handle
            .await
            .unwrap_or_else(|e| Err(PlannerError::Generation(format!("task failed: {e}"))));
        if let Err(e) = rows.settle(app_id, outcome) {
            for (_, rest) in pending.by_ref() {
                rest.abort();
            }
            return Err(e);
        }
    }
    Ok(())
}

async fn recommend(
    planner: &Planner,
    app_id: &str,
    best_practices: &str,
) -> Result<RecommendationRecord> {
    let bundle = planner
        .aggregator()
        .gather_with_best_practices(app_id, best_practices)
        .await;
    let request = planner.batch_request(prompt::recommendation_prompt(&bundle));
    let text = planner.model().invoke(&request).await?;

    let sections = parse_recommendation(&text);
    if sections.is_empty() {
        warn!(%app_id, "response contained none of the expected sections");
    } else {
        debug!(%app_id, missing = ?sections.missing(), "parsed recommendation");
    }
    Ok(sections.into_record(app_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use migrationplanner_artifacts::CSV_CONTENT_TYPE;
    use migrationplanner_generation::TextModel;
    use migrationplanner_shared::{AppConfig, GenerationRequest};

    use super::*;
    use crate::testing::{FakeKb, FakeModel, MemoryStore, RECOMMENDATION, harness};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct RecordingProgress {
        finished: Mutex<Vec<(String, bool)>>,
        done: Mutex<bool>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn app_finished(&self, app_id: &str, _current: usize, _total: usize, ok: bool) {
            self.finished.lock().unwrap().push((app_id.to_string(), ok));
        }
        fn done(&self, _result: &BatchResult) {
            *self.done.lock().unwrap() = true;
        }
    }

    #[test]
    fn split_trims_and_drops_empty_entries() {
        assert_eq!(split_app_ids("a1, a2 ,,a3,"), ids(&["a1", "a2", "a3"]));
        assert!(split_app_ids(" , ").is_empty());
    }

    #[tokio::test]
    async fn rows_follow_input_order() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));

        let result = run_batch(&h.planner, &ids(&["b2", "a1"]), &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.artifact.key, "R-Disposition-outputs/r_disposition_recommendations.csv");
        let app_ids: Vec<&str> = result.table.rows().iter().map(|r| r.app_id()).collect();
        assert_eq!(app_ids, vec!["b2", "a1"]);

        let row = &result.table.rows()[0];
        assert_eq!(
            row.patterns(),
            "1. Top 3 Recommended Migration Patterns:\nRehost-60%, Replatform-30%, Retain-10%"
        );
        assert_eq!(row.cost(), "4. Cost Breakdown and Total Cost for each Migration Pattern:\nAbout $900/month.");
        assert!(result.failed.is_empty());
        assert!(h.store.body(&result.artifact.key).unwrap().starts_with("App-id,"));
        assert_eq!(h.store.objects.lock().unwrap()[0].2, CSV_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn recommendations_use_batch_token_limit() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));

        run_batch(&h.planner, &ids(&["a1", "a2"]), &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(*h.model.max_tokens.lock().unwrap(), vec![10_000, 10_000]);
    }

    /// Model and progress reporter appending to one shared log.
    struct EventLog(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl TextModel for EventLog {
        async fn invoke(&self, request: &GenerationRequest) -> Result<String> {
            let app_id = ["a1", "a2", "a3"]
                .into_iter()
                .find(|id| request.prompt().contains(&format!("application ID {id} ")))
                .unwrap_or("?");
            self.0.lock().unwrap().push(format!("invoke {app_id}"));
            Ok(RECOMMENDATION.to_string())
        }
    }

    impl ProgressReporter for EventLog {
        fn phase(&self, _name: &str) {}
        fn app_finished(&self, app_id: &str, current: usize, total: usize, _ok: bool) {
            self.0
                .lock()
                .unwrap()
                .push(format!("finished {app_id} {current}/{total}"));
        }
        fn done(&self, _result: &BatchResult) {
            self.0.lock().unwrap().push("done".into());
        }
    }

    #[tokio::test]
    async fn progress_reported_as_each_application_settles() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let planner = Planner::new(
            &AppConfig::default(),
            crate::testing::ids(),
            Arc::new(FakeKb::default()),
            Arc::new(EventLog(log.clone())),
            Arc::new(MemoryStore::default()),
        );

        run_batch(&planner, &ids(&["a1", "a2", "a3"]), &BatchOptions::default(), &EventLog(log.clone()))
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "invoke a1",
                "finished a1 1/3",
                "invoke a2",
                "finished a2 2/3",
                "invoke a3",
                "finished a3 3/3",
                "done",
            ]
        );
    }

    #[test]
    fn workers_clamped_to_batch_size() {
        let options = |concurrency| BatchOptions {
            concurrency,
            failure_policy: FailurePolicy::Abort,
        };
        assert_eq!(options(0).workers(5), 1);
        assert_eq!(options(3).workers(5), 3);
        assert_eq!(options(8).workers(5), 5);
        assert_eq!(options(usize::MAX).workers(2), 2);
    }

    #[tokio::test]
    async fn oversized_concurrency_runs_batch() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));
        let options = BatchOptions {
            concurrency: usize::MAX,
            failure_policy: FailurePolicy::Abort,
        };

        let result = run_batch(&h.planner, &ids(&["a1", "a2"]), &options, &SilentProgress)
            .await
            .unwrap();

        let app_ids: Vec<&str> = result.table.rows().iter().map(|r| r.app_id()).collect();
        assert_eq!(app_ids, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn best_practices_fetched_once_per_batch() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));

        run_batch(&h.planner, &ids(&["a1", "a2", "a3"]), &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap();

        let queries = h.kb.queries.lock().unwrap();
        let bp = queries.iter().filter(|(id, _)| id == "KB-BP").count();
        assert_eq!(bp, 1);
        assert_eq!(queries.len(), 1 + 3 * 2);
        for prompt in h.model.prompts.lock().unwrap().iter() {
            assert!(prompt.contains("KB-BP fragment"));
        }
    }

    #[tokio::test]
    async fn generation_failure_aborts_without_csv() {
        let h = harness(
            FakeKb::default(),
            FakeModel::replying(RECOMMENDATION).failing_for(&["a2"]),
        );

        let err = run_batch(&h.planner, &ids(&["a1", "a2"]), &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PlannerError::Generation(_)));
        assert!(h.store.keys().is_empty());
    }

    #[tokio::test]
    async fn abort_stops_before_later_applications() {
        let h = harness(
            FakeKb::default(),
            FakeModel::replying(RECOMMENDATION).failing_for(&["a1"]),
        );

        run_batch(&h.planner, &ids(&["a1", "a2", "a3"]), &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(h.model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_failed_keeps_going() {
        let h = harness(
            FakeKb::default(),
            FakeModel::replying(RECOMMENDATION).failing_for(&["a2"]),
        );
        let options = BatchOptions {
            concurrency: 1,
            failure_policy: FailurePolicy::MarkFailed,
        };
        let progress = RecordingProgress::default();

        let result = run_batch(&h.planner, &ids(&["a1", "a2", "a3"]), &options, &progress)
            .await
            .unwrap();

        assert_eq!(result.table.len(), 3);
        let failed_row = &result.table.rows()[1];
        assert_eq!(failed_row.app_id(), "a2");
        assert!(failed_row.patterns().starts_with("generation failed: "));
        assert_eq!(failed_row.justification(), "");
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].app_id, "a2");

        assert_eq!(
            *progress.finished.lock().unwrap(),
            vec![("a1".to_string(), true), ("a2".to_string(), false), ("a3".to_string(), true)]
        );
        assert!(*progress.done.lock().unwrap());
    }

    #[tokio::test]
    async fn concurrent_batch_preserves_order() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));
        let options = BatchOptions {
            concurrency: 4,
            failure_policy: FailurePolicy::Abort,
        };
        let apps = ids(&["a1", "a2", "a3", "a4", "a5", "a6"]);

        let result = run_batch(&h.planner, &apps, &options, &SilentProgress)
            .await
            .unwrap();

        let app_ids: Vec<String> = result.table.rows().iter().map(|r| r.app_id().to_string()).collect();
        assert_eq!(app_ids, apps);
        assert_eq!(h.model.prompts.lock().unwrap().len(), apps.len());
    }

    #[tokio::test]
    async fn concurrent_mark_failed_keeps_every_row_in_order() {
        let h = harness(
            FakeKb::default(),
            FakeModel::replying(RECOMMENDATION).failing_for(&["a3"]),
        );
        let options = BatchOptions {
            concurrency: 3,
            failure_policy: FailurePolicy::MarkFailed,
        };
        let progress = RecordingProgress::default();
        let apps = ids(&["a1", "a2", "a3", "a4", "a5"]);

        let result = run_batch(&h.planner, &apps, &options, &progress)
            .await
            .unwrap();

        let app_ids: Vec<String> = result.table.rows().iter().map(|r| r.app_id().to_string()).collect();
        assert_eq!(app_ids, apps);
        let failed_row = &result.table.rows()[2];
        assert!(failed_row.patterns().starts_with("generation failed: "));
        assert_eq!(failed_row.cost(), "");
        assert!(result.table.rows()[3].patterns().starts_with("1. Top 3"));
        assert_eq!(
            result.failed,
            vec![FailedApp {
                app_id: "a3".into(),
                error: "generation error: ThrottlingException".into(),
            }]
        );

        let finished = progress.finished.lock().unwrap();
        let oks: Vec<bool> = finished.iter().map(|(_, ok)| *ok).collect();
        assert_eq!(oks, vec![true, true, false, true, true]);
        assert!(h.store.body(&result.artifact.key).unwrap().contains("generation failed: "));
    }

    #[tokio::test]
    async fn concurrent_abort_writes_nothing() {
        let h = harness(
            FakeKb::default(),
            FakeModel::replying(RECOMMENDATION).failing_for(&["a3"]),
        );
        let options = BatchOptions {
            concurrency: 3,
            failure_policy: FailurePolicy::Abort,
        };

        let err = run_batch(&h.planner, &ids(&["a1", "a2", "a3", "a4"]), &options, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PlannerError::Generation(_)));
        assert!(h.store.keys().is_empty());
    }

    #[tokio::test]
    async fn all_sources_failing_still_yields_rows() {
        let kb = FakeKb {
            failing: vec!["KB-APP", "KB-BP", "KB-QA"],
            ..Default::default()
        };
        let h = harness(kb, FakeModel::replying("no headers at all"));

        let result = run_batch(&h.planner, &ids(&["a1"]), &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.table.rows()[0].cells(), ["a1", "", "", "", ""]);
    }

    #[tokio::test]
    async fn empty_id_list_is_rejected() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));
        let err = run_batch(&h.planner, &[], &BatchOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation { .. }));
    }
}
