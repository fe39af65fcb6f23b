//! Pre-deployment validation of a generated landing page.
//!
//! Unlike the single-verdict checks, the build validator runs a set of page
//! rules and collects every finding as a [`Diagnostic`]. The build passes iff
//! no finding has `Error` severity; warnings are advisory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use stepgate_types::ArtifactError;

use crate::cache::ArtifactCache;
use crate::checks::find_placeholders;
use crate::checks::quality::MAX_LISTED_PLACEHOLDERS;
use crate::config::BuildConfig;
use crate::validation::{Diagnostic, Severity};

static HEADLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>.*?</h1>").expect("headline pattern is valid"));
static HERO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)class="hero""#).expect("hero pattern is valid"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img[^>]+src="[^"]+""#).expect("image pattern is valid"));

/// Everything a page rule may look at.
pub struct PageContext<'a> {
    pub path: &'a Path,
    pub text: &'a str,
    pub config: &'a BuildConfig,
}

impl PageContext<'_> {
    /// Directory local image references are resolved against.
    fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

pub trait PageRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, page: &PageContext<'_>) -> Vec<Diagnostic>;
}

fn diagnostic(rule: &str, severity: Severity, message: String, fix: Option<&str>) -> Diagnostic {
    Diagnostic {
        rule: rule.into(),
        severity,
        message,
        step: None,
        fix: fix.map(Into::into),
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct PlaceholderRule;
impl PageRule for PlaceholderRule {
    fn name(&self) -> &str { "no_placeholders" }
    fn apply(&self, page: &PageContext<'_>) -> Vec<Diagnostic> {
        let tokens = find_placeholders(page.text);
        if tokens.is_empty() {
            return vec![];
        }
        let listed: Vec<&str> = tokens.iter().take(MAX_LISTED_PLACEHOLDERS).copied().collect();
        vec![diagnostic(
            self.name(),
            Severity::Error,
            format!(
                "{} unresolved placeholders found: {}",
                tokens.len(),
                listed.join(", ")
            ),
            Some("Re-run the copy merge so every {{TOKEN}} is replaced"),
        )]
    }
}

/// Warns when a required landmark pattern does not occur anywhere on the page.
struct LandmarkRule {
    name: &'static str,
    pattern: &'static LazyLock<Regex>,
    message: &'static str,
}
impl PageRule for LandmarkRule {
    fn name(&self) -> &str { self.name }
    fn apply(&self, page: &PageContext<'_>) -> Vec<Diagnostic> {
        if self.pattern.is_match(page.text) {
            vec![]
        } else {
            vec![diagnostic(self.name, Severity::Warning, self.message.into(), None)]
        }
    }
}

struct LocalImagesRule;
impl PageRule for LocalImagesRule {
    fn name(&self) -> &str { "local_images_exist" }
    fn apply(&self, page: &PageContext<'_>) -> Vec<Diagnostic> {
        let pattern = format!(
            r#"src="({}[^"]+)""#,
            regex::escape(&page.config.image_prefix)
        );
        let Ok(sources) = Regex::new(&pattern) else {
            return vec![];
        };

        let referenced: BTreeSet<&str> = sources
            .captures_iter(page.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        let base = page.base_dir();
        referenced
            .into_iter()
            .filter(|src| !base.join(src).is_file())
            .map(|src| {
                diagnostic(
                    self.name(),
                    Severity::Error,
                    format!("Missing image: {src}"),
                    Some("Add the file or fix the src path"),
                )
            })
            .collect()
    }
}

struct PageSizeRule;
impl PageRule for PageSizeRule {
    fn name(&self) -> &str { "page_size" }
    fn apply(&self, page: &PageContext<'_>) -> Vec<Diagnostic> {
        let size = page.text.len() as u64;
        let min = page.config.min_page_bytes;
        if size >= min {
            return vec![];
        }
        vec![diagnostic(
            self.name(),
            Severity::Warning,
            format!(
                "{} seems too small ({size} bytes). Expected {min}+",
                page.path.display()
            ),
            None,
        )]
    }
}

fn page_rules() -> Vec<Box<dyn PageRule>> {
    vec![
        Box::new(PlaceholderRule),
        Box::new(LandmarkRule {
            name: "headline",
            pattern: &HEADLINE,
            message: "No <h1> headline found",
        }),
        Box::new(LandmarkRule {
            name: "hero_section",
            pattern: &HERO,
            message: "No hero section found",
        }),
        Box::new(LandmarkRule {
            name: "images",
            pattern: &IMAGE,
            message: "No images found",
        }),
        Box::new(LocalImagesRule),
        Box::new(PageSizeRule),
    ]
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub page: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildReport {
    pub fn passed(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }
}

/// Run every page rule against `page`, read through the cache.
pub fn validate_build(cache: &mut ArtifactCache, page: &Path, config: &BuildConfig) -> BuildReport {
    let text = match cache.read(page) {
        Ok(text) => text,
        Err(err) => {
            let message = match err {
                ArtifactError::NotFound { .. } => {
                    format!("CRITICAL: {} does not exist", page.display())
                }
                other => format!("CRITICAL: {other}"),
            };
            return BuildReport {
                page: page.to_path_buf(),
                diagnostics: vec![diagnostic("page_exists", Severity::Error, message, None)],
            };
        }
    };

    let context = PageContext {
        path: page,
        text: &text,
        config,
    };
    let mut diagnostics = Vec::new();
    for rule in page_rules() {
        diagnostics.extend(rule.apply(&context));
    }
    tracing::debug!(
        page = %page.display(),
        findings = diagnostics.len(),
        "build validated"
    );
    BuildReport {
        page: page.to_path_buf(),
        diagnostics,
    }
}
