//! Shared types, errors, and check verdicts for the stepgate verification engine.
//!
//! This crate provides the foundational types used across all other stepgate crates:
//! - `StepId`: opaque, non-empty pipeline step identifier
//! - `CheckResult`: verdict plus human-readable message returned by every check
//! - `markers`: stable substrings that classify failure messages
//! - `ArtifactError`: structural failure captured while reading an artifact
//! - `GateError`: caller-facing error taxonomy (misuse, configuration, I/O)

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

// ---------------------------------------------------------------------------
// Markers: greppable failure categories
// ---------------------------------------------------------------------------

/// Substrings carried by failing check messages.
///
/// Callers match on these instead of parsing prose, so their spelling is part
/// of the public contract.
pub mod markers {
    /// File exists but is below the size threshold.
    pub const TOO_SMALL: &str = "too small";
    /// File does not exist.
    pub const FILE_NOT_FOUND: &str = "FILE NOT FOUND";
    /// File exists but could not be read or parsed.
    pub const INVALID_ARTIFACT: &str = "INVALID ARTIFACT";
    /// JSON key (or inspected field) absent.
    pub const MISSING: &str = "MISSING";
    /// Literal text absent from an artifact.
    pub const TEXT_NOT_FOUND: &str = "TEXT NOT FOUND";
    /// Unresolved `{{TOKEN}}` markers remain.
    pub const PLACEHOLDERS_FOUND: &str = "PLACEHOLDERS FOUND";
    /// Copy matched the generic-phrase denylist.
    pub const GENERIC_LANGUAGE: &str = "GENERIC LANGUAGE";
    /// At least one prerequisite step has not completed.
    pub const NOT_COMPLETE: &str = "NOT complete";
}

// ---------------------------------------------------------------------------
// StepId
// ---------------------------------------------------------------------------

/// Identifier of a pipeline step, e.g. `"2A-scout"`.
///
/// The only structural rule is that it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(GateError::InvalidStepId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StepId {
    type Error = GateError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StepId {
    type Error = GateError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<StepId> for String {
    fn from(id: StepId) -> Self {
        id.0
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CheckResult
// ---------------------------------------------------------------------------

/// Verdict of a single check invocation.
///
/// A failing result always carries a non-empty message containing one of the
/// [`markers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
}

impl CheckResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty(), "failing checks must explain themselves");
        Self {
            passed: false,
            message,
        }
    }

    /// Tuple form used by drivers that only want `(passed, message)`.
    pub fn into_parts(self) -> (bool, String) {
        (self.passed, self.message)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "[{verdict}] {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// ArtifactError: cached structural failures
// ---------------------------------------------------------------------------

/// Why an artifact could not be used. Captured once by the artifact cache and
/// handed back on every later read of the same path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    #[error("{path} does not exist")]
    NotFound { path: String },

    #[error("{path} could not be read: {message}")]
    Unreadable { path: String, message: String },

    #[error("{path} is not valid UTF-8 text")]
    NotText { path: String },

    #[error("{path} is not valid JSON: {message}")]
    MalformedJson { path: String, message: String },
}

impl ArtifactError {
    pub fn path(&self) -> &str {
        match self {
            ArtifactError::NotFound { path }
            | ArtifactError::Unreadable { path, .. }
            | ArtifactError::NotText { path }
            | ArtifactError::MalformedJson { path, .. } => path,
        }
    }

    /// Marker to embed in a failing check message for this error.
    pub fn marker(&self) -> &'static str {
        match self {
            ArtifactError::NotFound { .. } => markers::FILE_NOT_FOUND,
            _ => markers::INVALID_ARTIFACT,
        }
    }
}

// ---------------------------------------------------------------------------
// GateError: caller-facing errors
// ---------------------------------------------------------------------------

/// Unified error type for everything that is not an ordinary check verdict.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    // === Caller misuse ===
    #[error("Unknown check '{name}'")]
    UnknownCheck { name: String },

    #[error("Check '{check}' expects {expected}, got {got} argument(s)")]
    ArgumentCount {
        check: String,
        expected: String,
        got: usize,
    },

    #[error("Check '{check}' received invalid argument '{value}': {message}")]
    InvalidArgument {
        check: String,
        value: String,
        message: String,
    },

    #[error("Step identifier must be non-empty, got {0:?}")]
    InvalidStepId(String),

    // === Configuration ===
    #[error("Invalid dependency graph: {0}")]
    InvalidGraph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl GateError {
    /// Returns `true` if the error is a caller defect (bad dispatch or
    /// arguments) rather than a problem with the environment.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            GateError::UnknownCheck { .. }
                | GateError::ArgumentCount { .. }
                | GateError::InvalidArgument { .. }
                | GateError::InvalidStepId(_)
        )
    }
}

/// A convenience alias for `Result<T, GateError>`.
pub type Result<T> = std::result::Result<T, GateError>;
