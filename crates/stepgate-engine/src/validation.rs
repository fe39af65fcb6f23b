//! Dependency-table validation: lint rules and diagnostics.
//!
//! Provides 4 built-in rules that check the structural soundness of a
//! [`DependencyGraph`]. Call [`validate`] for advisory diagnostics or
//! [`validate_or_raise`] to fail on any `Error`-severity issue.

use std::fmt;

use serde::Serialize;
use stepgate_types::{GateError, Result};

use crate::graph::DependencyGraph;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub step: Option<String>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.rule, self.message)?;
        if let Some(fix) = &self.fix {
            write!(f, " (fix: {fix})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, graph: &DependencyGraph) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct NoSelfDependencyRule;
impl LintRule for NoSelfDependencyRule {
    fn name(&self) -> &str { "no_self_dependency" }
    fn apply(&self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        graph
            .entries()
            .filter(|(step, prereqs)| prereqs.contains(*step))
            .map(|(step, _)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Step '{step}' lists itself as a prerequisite"),
                step: Some(step.to_string()),
                fix: Some(format!("Remove '{step}' from its own prerequisite set")),
            })
            .collect()
    }
}

struct NoCyclesRule;
impl LintRule for NoCyclesRule {
    fn name(&self) -> &str { "no_cycles" }
    fn apply(&self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        // Self-loops are reported by their own rule.
        let mut without_self_loops = DependencyGraph::new();
        for (step, prereqs) in graph.entries() {
            let others = prereqs.iter().filter(|p| *p != step).map(|p| p.as_str());
            if without_self_loops.insert(step.as_str(), others).is_err() {
                return vec![];
            }
        }
        match without_self_loops.topological_order() {
            Ok(_) => vec![],
            Err(err) => vec![Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: err.to_string(),
                step: None,
                fix: Some("Break the cycle so every step can eventually start".into()),
            }],
        }
    }
}

struct PrerequisiteDeclaredRule;
impl LintRule for PrerequisiteDeclaredRule {
    fn name(&self) -> &str { "prerequisite_declared" }
    fn apply(&self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for (step, prereqs) in graph.entries() {
            for prereq in prereqs.iter().filter(|p| !graph.is_declared(p.as_str())) {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!(
                        "Step '{step}' requires '{prereq}', which has no entry in the table"
                    ),
                    step: Some(step.to_string()),
                    fix: Some(format!("Declare '{prereq}' or fix the spelling")),
                });
            }
        }
        diags
    }
}

struct SingleEntryRule;
impl LintRule for SingleEntryRule {
    fn name(&self) -> &str { "single_entry" }
    fn apply(&self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        if graph.is_empty() || graph.entries().any(|(_, prereqs)| prereqs.is_empty()) {
            return vec![];
        }
        vec![Diagnostic {
            rule: self.name().into(),
            severity: Severity::Warning,
            message: "No step has an empty prerequisite set; nothing can start from scratch".into(),
            step: None,
            fix: Some("Declare an entry step with no prerequisites".into()),
        }]
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all lint rules and return every diagnostic.
pub fn validate(graph: &DependencyGraph) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(NoSelfDependencyRule),
        Box::new(NoCyclesRule),
        Box::new(PrerequisiteDeclaredRule),
        Box::new(SingleEntryRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(graph));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(graph: &DependencyGraph) -> Result<Vec<Diagnostic>> {
    let diagnostics = validate(graph);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(GateError::InvalidGraph(messages.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
