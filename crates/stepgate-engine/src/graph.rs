use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use stepgate_types::{GateError, Result, StepId};

/// Prerequisite table: step → steps that must all be complete before it may
/// start.
///
/// Joins are always all-of. Steps with an empty set (or no entry at all) may
/// start with nothing completed, and siblings sharing a prerequisite set are
/// never ordered relative to each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    table: BTreeMap<StepId, BTreeSet<StepId>>,
}

const STANDARD_PIPELINE: &[(&str, &[&str])] = &[
    ("1-initialize", &[]),
    ("2A-scout", &["1-initialize"]),
    ("2B-spy", &["1-initialize"]),
    ("2C-profiler", &["1-initialize"]),
    ("2D-avatar", &["1-initialize"]),
    ("2E-mechanic", &["1-initialize"]),
    (
        "2F-strategist",
        &["2A-scout", "2B-spy", "2C-profiler", "2D-avatar", "2E-mechanic"],
    ),
    ("3-copywriter", &["2F-strategist"]),
    ("4-builder", &["3-copywriter"]),
    ("5-auditor", &["4-builder"]),
];

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The content pipeline's built-in table.
    pub fn standard() -> Self {
        let table = STANDARD_PIPELINE
            .iter()
            .filter_map(|(step, prereqs)| {
                let step = StepId::new(*step).ok()?;
                let prereqs = prereqs.iter().filter_map(|p| StepId::new(*p).ok()).collect();
                Some((step, prereqs))
            })
            .collect();
        Self { table }
    }

    /// Declare `step` with the given prerequisites, replacing any previous
    /// declaration.
    pub fn insert<I, S>(&mut self, step: &str, prerequisites: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let step = StepId::new(step)?;
        let prereqs = prerequisites
            .into_iter()
            .map(|p| StepId::new(p.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        self.table.insert(step, prereqs);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_step<I, S>(mut self, step: &str, prerequisites: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(step, prerequisites)?;
        Ok(self)
    }

    /// Declared prerequisites, or `None` when `step` has no entry.
    pub fn prerequisites(&self, step: &str) -> Option<&BTreeSet<StepId>> {
        self.table.get(step)
    }

    pub fn is_declared(&self, step: &str) -> bool {
        self.table.contains_key(step)
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepId> {
        self.table.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&StepId, &BTreeSet<StepId>)> {
        self.table.iter()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Prerequisites of `step` absent from `completed`, in table order. An
    /// undeclared step has none.
    pub fn missing_prerequisites<'a>(
        &'a self,
        step: &str,
        completed: &BTreeSet<&str>,
    ) -> Vec<&'a StepId> {
        self.prerequisites(step)
            .map(|prereqs| {
                prereqs
                    .iter()
                    .filter(|p| !completed.contains(p.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared steps not yet completed whose prerequisites are all complete.
    pub fn ready_steps(&self, completed: &BTreeSet<&str>) -> Vec<&StepId> {
        self.table
            .iter()
            .filter(|(step, _)| !completed.contains(step.as_str()))
            .filter(|(_, prereqs)| prereqs.iter().all(|p| completed.contains(p.as_str())))
            .map(|(step, _)| step)
            .collect()
    }

    /// Steps in an order where every declared prerequisite precedes its
    /// dependents. Prerequisites that are not themselves declared are treated
    /// as already satisfied.
    pub fn topological_order(&self) -> Result<Vec<&StepId>> {
        let mut indegree: BTreeMap<&StepId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&StepId, Vec<&StepId>> = BTreeMap::new();
        for (step, prereqs) in &self.table {
            let declared = prereqs.iter().filter(|p| self.table.contains_key(*p));
            let mut count = 0;
            for prereq in declared {
                dependents.entry(prereq).or_default().push(step);
                count += 1;
            }
            indegree.insert(step, count);
        }

        let mut queue: VecDeque<&StepId> = indegree
            .iter()
            .filter(|(_, &n)| n == 0)
            .map(|(s, _)| *s)
            .collect();
        let mut order = Vec::with_capacity(self.table.len());

        while let Some(step) = queue.pop_front() {
            order.push(step);
            for next in dependents.get(step).into_iter().flatten() {
                if let Some(n) = indegree.get_mut(next) {
                    *n -= 1;
                    if *n == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() < self.table.len() {
            let stuck: Vec<&str> = indegree
                .iter()
                .filter(|(_, &n)| n > 0)
                .map(|(s, _)| s.as_str())
                .collect();
            return Err(GateError::InvalidGraph(format!(
                "dependency cycle among: {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }
}
