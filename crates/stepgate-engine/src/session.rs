//! Verification session: the explicit owner of the artifact cache.
//!
//! A session binds a project root, its configuration, the dependency table and
//! the denylist to one [`ArtifactCache`]. Each check method resolves relative
//! paths against the root, evaluates through the cache, and logs the verdict.
//! Call [`VerificationSession::clear_cache`] between logically independent
//! passes so edits made on disk in the meantime are observed.

use std::path::{Path, PathBuf};

use stepgate_types::{CheckResult, Result};

use crate::build::{self, BuildReport};
use crate::cache::{ArtifactCache, CacheStats};
use crate::checks::{self, GenericPhrases};
use crate::config::EngineConfig;
use crate::gate;
use crate::graph::DependencyGraph;
use crate::progress::ProgressRecord;
use crate::validation::{self, Diagnostic};

pub struct VerificationSession {
    root: PathBuf,
    config: EngineConfig,
    graph: DependencyGraph,
    phrases: GenericPhrases,
    diagnostics: Vec<Diagnostic>,
    cache: ArtifactCache,
}

fn logged(check: &str, result: CheckResult) -> CheckResult {
    tracing::info!(check, passed = result.passed, "{}", result.message);
    result
}

impl VerificationSession {
    /// Open a session at `root`, picking up `stepgate.json` there if present.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = EngineConfig::discover(&root)?;
        Self::with_config(root, config)
    }

    /// Open a session with an explicit configuration.
    ///
    /// The dependency table is linted here; cycles and self-dependencies are
    /// rejected, lesser findings are logged and kept in [`diagnostics`](Self::diagnostics).
    pub fn with_config(root: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        let root = root.into();
        let graph = config.graph()?;
        let diagnostics = validation::validate_or_raise(&graph)?;
        for diag in &diagnostics {
            tracing::warn!(rule = %diag.rule, "{}", diag.message);
        }
        let phrases = config.phrases();
        tracing::debug!(
            root = %root.display(),
            steps = graph.len(),
            phrases = phrases.phrases().len(),
            "verification session opened"
        );
        Ok(Self {
            root,
            config,
            graph,
            phrases,
            diagnostics,
            cache: ArtifactCache::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn phrases(&self) -> &GenericPhrases {
        &self.phrases
    }

    /// Non-fatal lint findings on the dependency table.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resolve `path` against the session root unless it is already absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    // -- Primitive checks ---------------------------------------------------

    pub fn file_exists_and_valid(
        &mut self,
        path: impl AsRef<Path>,
        min_bytes: u64,
    ) -> CheckResult {
        let path = self.resolve(path);
        logged(
            "file_exists_and_valid",
            checks::file_exists_and_valid(&mut self.cache, &path, min_bytes),
        )
    }

    pub fn has_key(&mut self, path: impl AsRef<Path>, key: &str) -> CheckResult {
        let path = self.resolve(path);
        logged("has_key", checks::has_key(&mut self.cache, &path, key))
    }

    pub fn contains_text(&mut self, path: impl AsRef<Path>, literal: &str) -> CheckResult {
        let path = self.resolve(path);
        logged(
            "contains_text",
            checks::contains_text(&mut self.cache, &path, literal),
        )
    }

    // -- Content quality ----------------------------------------------------

    pub fn no_placeholder(&mut self, path: impl AsRef<Path>) -> CheckResult {
        let path = self.resolve(path);
        logged("no_placeholder", checks::no_placeholder(&mut self.cache, &path))
    }

    pub fn generic_language(&mut self, path: impl AsRef<Path>) -> CheckResult {
        let path = self.resolve(path);
        let result = checks::generic_language(
            &mut self.cache,
            &path,
            &self.config.copy_fields,
            &self.phrases,
        );
        logged("generic_language", result)
    }

    // -- Gate ---------------------------------------------------------------

    pub fn progress_path(&self) -> PathBuf {
        self.resolve(&self.config.progress_file)
    }

    /// Current progress record, read through the cache.
    pub fn load_progress(&mut self) -> ProgressRecord {
        let path = self.progress_path();
        ProgressRecord::load(&mut self.cache, &path)
    }

    pub fn previous_step_passed(&mut self, step: &str) -> CheckResult {
        let progress = self.load_progress();
        logged(
            "previous_step_passed",
            gate::previous_step_passed(&self.graph, &progress, step),
        )
    }

    // -- Build --------------------------------------------------------------

    /// Validate `page`, or the configured default page when `None`.
    pub fn validate_build(&mut self, page: Option<&Path>) -> BuildReport {
        let page = self.resolve(page.unwrap_or(&self.config.build.page));
        let report = build::validate_build(&mut self.cache, &page, &self.config.build);
        tracing::info!(
            page = %page.display(),
            passed = report.passed(),
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "build validated"
        );
        report
    }

    // -- Cache --------------------------------------------------------------

    /// Forget every cached artifact and progress read.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
