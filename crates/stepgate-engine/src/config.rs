//! Engine configuration, read from an optional `stepgate.json`.
//!
//! Every field has a default, so an absent file and `{}` configure the same
//! engine: the standard dependency table, the built-in generic-phrase
//! denylist, and `progress.json` at the session root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stepgate_types::{GateError, Result};

use crate::checks::GenericPhrases;
use crate::graph::DependencyGraph;

/// Configuration file looked up at the session root by [`EngineConfig::discover`].
pub const FILE_NAME: &str = "stepgate.json";

fn default_progress_file() -> PathBuf {
    PathBuf::from("progress.json")
}

fn default_copy_fields() -> Vec<String> {
    vec!["copy".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Progress record location, relative to the session root.
    pub progress_file: PathBuf,
    /// JSON fields scanned by the generic-language check.
    pub copy_fields: Vec<String>,
    /// Extra denylist phrases.
    pub generic_phrases: Vec<String>,
    /// Use only `generic_phrases`, dropping the built-in list.
    pub replace_default_phrases: bool,
    /// Full replacement for the standard dependency table.
    pub dependencies: Option<BTreeMap<String, Vec<String>>>,
    pub build: BuildConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_file: default_progress_file(),
            copy_fields: default_copy_fields(),
            generic_phrases: Vec::new(),
            replace_default_phrases: false,
            dependencies: None,
            build: BuildConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Page checked when `validate_build` is given none.
    pub page: PathBuf,
    /// Pages smaller than this draw a warning.
    pub min_page_bytes: u64,
    /// `src` prefix marking locally hosted images whose files must exist.
    pub image_prefix: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            page: PathBuf::from("index.html"),
            min_page_bytes: 50_000,
            image_prefix: "images/".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration file. Unlike artifacts, a broken config is a
    /// hard error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            GateError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|err| GateError::Config(format!("{}: {err}", path.display())))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `stepgate.json` from `root` when present, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// The configured dependency table, or the standard one.
    pub fn graph(&self) -> Result<DependencyGraph> {
        let Some(table) = &self.dependencies else {
            return Ok(DependencyGraph::standard());
        };
        let mut graph = DependencyGraph::new();
        for (step, prereqs) in table {
            graph.insert(step, prereqs).map_err(|err| {
                GateError::Config(format!("dependencies.{step}: {err}"))
            })?;
        }
        Ok(graph)
    }

    /// The effective generic-phrase denylist.
    pub fn phrases(&self) -> GenericPhrases {
        let mut phrases = if self.replace_default_phrases {
            GenericPhrases::from_phrases(Vec::<String>::new())
        } else {
            GenericPhrases::default()
        };
        phrases.extend(&self.generic_phrases);
        phrases
    }
}
