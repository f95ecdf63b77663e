//! Task descriptors produced by the stack classifier

use serde::Serialize;
use std::collections::HashSet;

/// One live background task at a point in time
///
/// Built fresh on every snapshot and never mutated. Identity for leak
/// detection is the `id` alone: a task whose record text changes between
/// snapshots is still the same task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    /// Runtime-assigned identifier (kernel thread id for `/proc` dumps)
    pub id: u64,
    /// Full trimmed stack record, header included
    pub stack: String,
}

impl TaskDescriptor {
    pub fn new(id: u64, stack: impl Into<String>) -> Self {
        Self {
            id,
            stack: stack.into(),
        }
    }
}

/// Ids of the tasks alive when a check started
pub type Baseline = HashSet<u64>;

/// Tasks in `current` whose id is absent from `baseline`, in input order
pub fn leaked_tasks(baseline: &Baseline, current: Vec<TaskDescriptor>) -> Vec<TaskDescriptor> {
    current
        .into_iter()
        .filter(|task| !baseline.contains(&task.id))
        .collect()
}
