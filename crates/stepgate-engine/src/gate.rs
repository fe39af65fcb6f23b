use stepgate_types::{markers, CheckResult};

use crate::graph::DependencyGraph;
use crate::progress::ProgressRecord;

/// Decide whether `step` may start given what `progress` says is complete.
///
/// Passes iff every declared prerequisite is in the completed set. A step
/// with no entry in `graph` is treated as having no prerequisites.
pub fn previous_step_passed(
    graph: &DependencyGraph,
    progress: &ProgressRecord,
    step: &str,
) -> CheckResult {
    let Some(prereqs) = graph.prerequisites(step).filter(|p| !p.is_empty()) else {
        return CheckResult::pass(format!("'{step}' has no prerequisites"));
    };

    let completed = progress.completed();
    let missing = graph.missing_prerequisites(step, &completed);
    let total = prereqs.len();
    let done = total - missing.len();

    if missing.is_empty() {
        CheckResult::pass(format!(
            "Prerequisites complete for '{step}' ({done}/{total})"
        ))
    } else {
        let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
        CheckResult::fail(format!(
            "Prerequisites {} for '{step}': missing {} ({done}/{total} complete)",
            markers::NOT_COMPLETE,
            names.join(", ")
        ))
    }
}
