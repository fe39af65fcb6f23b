//! Progress reader: which steps the pipeline driver has recorded as complete.
//!
//! The record lives in a single JSON file (`progress.json` by default) shaped
//! as `{"steps_completed": [{"step": "1-initialize", ...}, ...]}`. The engine
//! only reads it. Anything it cannot make sense of counts as "nothing
//! completed" rather than an error, so a fresh pipeline with no record yet
//! gates exactly like one with an empty record.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stepgate_types::{ArtifactError, StepId};

use crate::cache::ArtifactCache;

/// Field of the progress object holding the ordered completion list.
pub const STEPS_FIELD: &str = "steps_completed";

/// One completed step, in the order the driver recorded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub step: StepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Driver-specific fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressEntry {
    pub fn new(step: StepId) -> Self {
        Self {
            step,
            completed_at: None,
            extra: Map::new(),
        }
    }

    /// Build from one raw list element; `None` when it has no usable `step`.
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let step = object.get("step")?.as_str()?;
        let step = StepId::new(step).ok()?;

        let mut extra = object.clone();
        extra.remove("step");
        let completed_at = match extra.get("completed_at").and_then(Value::as_str) {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => {
                    extra.remove("completed_at");
                    Some(ts.with_timezone(&Utc))
                }
                // Unparseable timestamps stay in `extra` untouched.
                Err(_) => None,
            },
            None => None,
        };

        Some(Self {
            step,
            completed_at,
            extra,
        })
    }
}

/// Ordered record of completed steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(rename = "steps_completed", default)]
    entries: Vec<ProgressEntry>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ProgressEntry>) -> Self {
        Self { entries }
    }

    /// Interpret an already-parsed progress document.
    ///
    /// A non-object document, a missing or non-array `steps_completed`, and
    /// list elements without a non-empty string `step` are all tolerated.
    pub fn from_value(value: &Value) -> Self {
        let Some(list) = value.get(STEPS_FIELD) else {
            tracing::debug!("progress record has no {STEPS_FIELD} field");
            return Self::new();
        };
        let Some(items) = list.as_array() else {
            tracing::warn!("{STEPS_FIELD} is not a list; treating as empty");
            return Self::new();
        };

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match ProgressEntry::from_value(item) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(index, "skipping progress entry without a step"),
            }
        }
        Self { entries }
    }

    /// Read the record at `path` through the cache.
    ///
    /// A missing file is an empty record; an unreadable or malformed one is
    /// logged and also treated as empty.
    pub fn load(cache: &mut ArtifactCache, path: &Path) -> Self {
        match cache.read_json(path) {
            Ok(value) => {
                let record = Self::from_value(&value);
                tracing::debug!(
                    path = %path.display(),
                    completed = record.len(),
                    "progress record loaded"
                );
                record
            }
            Err(ArtifactError::NotFound { .. }) => {
                tracing::debug!(path = %path.display(), "no progress record; nothing completed");
                Self::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "unusable progress record; nothing completed");
                Self::new()
            }
        }
    }

    /// Entries in completion order.
    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    /// Step ids in completion order, duplicates included.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.step.as_str())
    }

    /// The set of completed step ids.
    pub fn completed(&self) -> BTreeSet<&str> {
        self.steps().collect()
    }

    pub fn is_complete(&self, step: &str) -> bool {
        self.steps().any(|s| s == step)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
