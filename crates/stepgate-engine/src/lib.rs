//! Step verification engine for a file-producing content pipeline.
//!
//! This crate implements the artifact cache, the primitive and content-quality
//! checks, the step dependency graph with its lint rules, the progress reader,
//! the step gate, named check dispatch, and the pre-deployment build validator.
//! [`VerificationSession`] ties them together around one explicitly owned cache.

pub mod build;
pub mod cache;
pub mod checks;
pub mod config;
pub mod gate;
pub mod graph;
pub mod progress;
pub mod registry;
pub mod session;
pub mod validation;

pub use build::{validate_build, BuildReport, PageContext, PageRule};
pub use cache::{ArtifactCache, CacheStats};
pub use checks::{
    contains_text, file_exists_and_valid, find_placeholders, generic_language, has_key,
    no_placeholder, GenericPhrases,
};
pub use config::{BuildConfig, EngineConfig};
pub use gate::previous_step_passed;
pub use graph::DependencyGraph;
pub use progress::{ProgressEntry, ProgressRecord};
pub use registry::{default_registry, parse_min_size, Check, CheckRegistry};
pub use session::VerificationSession;
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
