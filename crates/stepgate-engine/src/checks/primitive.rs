//! Stateless predicates over file metadata, JSON structure, and raw text.

use std::path::Path;

use stepgate_types::{markers, ArtifactError, CheckResult};

use crate::cache::ArtifactCache;

fn artifact_failure(err: &ArtifactError) -> CheckResult {
    CheckResult::fail(format!("{}: {err}", err.marker()))
}

/// Pass iff the file exists and holds at least `min_bytes` bytes.
pub fn file_exists_and_valid(
    cache: &mut ArtifactCache,
    path: &Path,
    min_bytes: u64,
) -> CheckResult {
    let bytes = match cache.read_bytes(path) {
        Ok(bytes) => bytes,
        Err(err) => return artifact_failure(&err),
    };
    let size = bytes.len() as u64;
    if size < min_bytes {
        CheckResult::fail(format!(
            "{} is {} ({size} bytes < {min_bytes} bytes required)",
            path.display(),
            markers::TOO_SMALL
        ))
    } else {
        CheckResult::pass(format!("{} exists ({size} bytes)", path.display()))
    }
}

/// Pass iff the file is a JSON object with `key` present. The value is not
/// inspected: `null` and `""` count as present.
pub fn has_key(cache: &mut ArtifactCache, path: &Path, key: &str) -> CheckResult {
    let value = match cache.read_json(path) {
        Ok(value) => value,
        Err(err) => {
            return CheckResult::fail(format!(
                "{} key '{key}': {} ({err})",
                markers::MISSING,
                err.marker()
            ))
        }
    };
    match value.as_object() {
        Some(map) if map.contains_key(key) => {
            CheckResult::pass(format!("Key '{key}' present in {}", path.display()))
        }
        Some(_) => CheckResult::fail(format!(
            "{} key '{key}' in {}",
            markers::MISSING,
            path.display()
        )),
        None => CheckResult::fail(format!(
            "{} key '{key}': {} is not a JSON object",
            markers::MISSING,
            path.display()
        )),
    }
}

/// Pass iff `literal` occurs verbatim (case-sensitive) in the file.
pub fn contains_text(cache: &mut ArtifactCache, path: &Path, literal: &str) -> CheckResult {
    let text = match cache.read(path) {
        Ok(text) => text,
        Err(err) => {
            return CheckResult::fail(format!(
                "{}: '{literal}' could not be searched ({}: {err})",
                markers::TEXT_NOT_FOUND,
                err.marker()
            ))
        }
    };
    if text.contains(literal) {
        CheckResult::pass(format!("Found '{literal}' in {}", path.display()))
    } else {
        CheckResult::fail(format!(
            "{}: '{literal}' missing from {}",
            markers::TEXT_NOT_FOUND,
            path.display()
        ))
    }
}
