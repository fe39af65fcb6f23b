//! Named check dispatch.
//!
//! A pipeline driver names a check and passes positional string arguments.
//! The registry maps the name to a [`Check`], which validates its arguments
//! and runs against a [`VerificationSession`]. Verdicts come back as
//! `Ok(CheckResult)`; an unknown name or malformed arguments come back as a
//! [`GateError`] so a caller defect is never mistaken for a failed check.

use std::collections::BTreeMap;

use stepgate_types::{CheckResult, GateError, Result, StepId};

use crate::session::VerificationSession;

// ---------------------------------------------------------------------------
// Check trait
// ---------------------------------------------------------------------------

pub trait Check: Send + Sync {
    /// The name the check is dispatched by (e.g. "has_key").
    fn name(&self) -> &str;

    /// Positional argument synopsis, e.g. `"<path> <key>"`.
    fn usage(&self) -> &str;

    /// Validate `args` and evaluate the check.
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult>;
}

// ---------------------------------------------------------------------------
// CheckRegistry
// ---------------------------------------------------------------------------

pub struct CheckRegistry {
    checks: BTreeMap<String, Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self {
            checks: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, check: impl Check + 'static) {
        self.checks.insert(check.name().to_string(), Box::new(check));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Check> {
        self.checks.get(name).map(|c| c.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Registered checks, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.values().map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Dispatch `name` with `args` against `session`.
    pub fn run(
        &self,
        session: &mut VerificationSession,
        name: &str,
        args: &[String],
    ) -> Result<CheckResult> {
        let check = self.get(name).ok_or_else(|| GateError::UnknownCheck {
            name: name.to_string(),
        })?;
        check.run(session, args)
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry holding the six built-in checks.
pub fn default_registry() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    registry.register(FileExistsAndValid);
    registry.register(HasKey);
    registry.register(ContainsText);
    registry.register(NoPlaceholder);
    registry.register(GenericLanguage);
    registry.register(PreviousStepPassed);
    registry
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn arity(check: &dyn Check, args: &[String], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("{min} argument(s) {}", check.usage())
    } else {
        format!("{min}-{max} arguments {}", check.usage())
    };
    Err(GateError::ArgumentCount {
        check: check.name().to_string(),
        expected,
        got: args.len(),
    })
}

/// Default `file_exists_and_valid` threshold when none is given.
pub const DEFAULT_MIN_BYTES: u64 = 1024;

/// Parse a size threshold into bytes.
///
/// A bare integer is kilobytes (`"50"` is 51200 bytes). Explicit suffixes
/// `B`, `KB` and `MB` are accepted case-insensitively, with or without a
/// space before them.
pub fn parse_min_size(check: &str, raw: &str) -> Result<u64> {
    let invalid = |message: &str| GateError::InvalidArgument {
        check: check.to_string(),
        value: raw.to_string(),
        message: message.to_string(),
    };

    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid("expected a non-negative integer size"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| invalid("size does not fit in 64 bits"))?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "K" | "KB" => 1024,
        "B" => 1,
        "M" | "MB" => 1024 * 1024,
        _ => return Err(invalid("unknown size unit; use B, KB or MB")),
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("size does not fit in 64 bits"))
}

// ---------------------------------------------------------------------------
// Built-in checks
// ---------------------------------------------------------------------------

struct FileExistsAndValid;
impl Check for FileExistsAndValid {
    fn name(&self) -> &str { "file_exists_and_valid" }
    fn usage(&self) -> &str { "<path> [min_size]" }
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult> {
        arity(self, args, 1, 2)?;
        let min_bytes = match args.get(1) {
            Some(raw) => parse_min_size(self.name(), raw)?,
            None => DEFAULT_MIN_BYTES,
        };
        Ok(session.file_exists_and_valid(&args[0], min_bytes))
    }
}

struct HasKey;
impl Check for HasKey {
    fn name(&self) -> &str { "has_key" }
    fn usage(&self) -> &str { "<path> <key>" }
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult> {
        arity(self, args, 2, 2)?;
        Ok(session.has_key(&args[0], &args[1]))
    }
}

struct ContainsText;
impl Check for ContainsText {
    fn name(&self) -> &str { "contains_text" }
    fn usage(&self) -> &str { "<path> <literal>" }
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult> {
        arity(self, args, 2, 2)?;
        if args[1].is_empty() {
            return Err(GateError::InvalidArgument {
                check: self.name().to_string(),
                value: String::new(),
                message: "literal must be non-empty".into(),
            });
        }
        Ok(session.contains_text(&args[0], &args[1]))
    }
}

struct NoPlaceholder;
impl Check for NoPlaceholder {
    fn name(&self) -> &str { "no_placeholder" }
    fn usage(&self) -> &str { "<path>" }
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult> {
        arity(self, args, 1, 1)?;
        Ok(session.no_placeholder(&args[0]))
    }
}

struct GenericLanguage;
impl Check for GenericLanguage {
    fn name(&self) -> &str { "generic_language" }
    fn usage(&self) -> &str { "<path>" }
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult> {
        arity(self, args, 1, 1)?;
        Ok(session.generic_language(&args[0]))
    }
}

struct PreviousStepPassed;
impl Check for PreviousStepPassed {
    fn name(&self) -> &str { "previous_step_passed" }
    fn usage(&self) -> &str { "<step>" }
    fn run(&self, session: &mut VerificationSession, args: &[String]) -> Result<CheckResult> {
        arity(self, args, 1, 1)?;
        let step = StepId::new(args[0].as_str())?;
        Ok(session.previous_step_passed(step.as_str()))
    }
}
