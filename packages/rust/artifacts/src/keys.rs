//! Deterministic object keys. Re-running a request for the same input
//! overwrites the previous artifact.

/// Suffix appended to the application id for single-plan artifacts.
pub const PLAN_KEY_SUFFIX: &str = "_migration_plan.txt";

/// File name of the batch recommendations table.
pub const RECOMMENDATIONS_FILE: &str = "r_disposition_recommendations.csv";

/// `{prefix}/{app_id}_migration_plan.txt`
pub fn plan_key(prefix: &str, app_id: &str) -> String {
    join(prefix, &format!("{app_id}{PLAN_KEY_SUFFIX}"))
}

/// `{prefix}/r_disposition_recommendations.csv`
pub fn recommendations_key(prefix: &str) -> String {
    join(prefix, RECOMMENDATIONS_FILE)
}

fn join(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
