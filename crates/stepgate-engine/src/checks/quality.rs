//! Content-quality heuristics: unresolved template tokens and generic copy.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use stepgate_types::{markers, CheckResult};

use crate::cache::ArtifactCache;

/// Unique placeholder tokens shown in a failure message before eliding.
pub const MAX_LISTED_PLACEHOLDERS: usize = 10;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[A-Z_]+\}\}").expect("placeholder pattern is valid"));

const DEFAULT_GENERIC_PHRASES: &[&str] = &[
    "premium quality",
    "high quality",
    "best in class",
    "best-in-class",
    "world class",
    "world-class",
    "cutting edge",
    "cutting-edge",
    "state of the art",
    "state-of-the-art",
    "top notch",
    "top-notch",
    "game changer",
    "game-changer",
    "second to none",
    "unparalleled quality",
    "one-stop shop",
    "take it to the next level",
    "look no further",
    "you won't regret it",
];

/// Unique `{{UPPER_CASE}}` tokens in first-seen order.
pub fn find_placeholders(text: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| seen.insert(*token))
        .collect()
}

/// Pass iff the file contains no unresolved placeholder tokens.
pub fn no_placeholder(cache: &mut ArtifactCache, path: &Path) -> CheckResult {
    let text = match cache.read(path) {
        Ok(text) => text,
        Err(err) => return CheckResult::fail(format!("{}: {err}", err.marker())),
    };
    let tokens = find_placeholders(&text);
    if tokens.is_empty() {
        return CheckResult::pass(format!("No placeholders in {}", path.display()));
    }

    let mut listed = tokens
        .iter()
        .take(MAX_LISTED_PLACEHOLDERS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if tokens.len() > MAX_LISTED_PLACEHOLDERS {
        listed.push_str(&format!(" (+{} more)", tokens.len() - MAX_LISTED_PLACEHOLDERS));
    }
    CheckResult::fail(format!(
        "{} in {}: {} unique unresolved: {listed}",
        markers::PLACEHOLDERS_FOUND,
        path.display(),
        tokens.len()
    ))
}

// ---------------------------------------------------------------------------
// Generic language
// ---------------------------------------------------------------------------

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Word-bounded, case-insensitive pattern for a normalized phrase.
fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let starts_word = phrase.starts_with(|c: char| c.is_alphanumeric());
    let ends_word = phrase.ends_with(|c: char| c.is_alphanumeric());
    let pattern = format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(phrase),
        if ends_word { r"\b" } else { "" },
    );
    Regex::new(&pattern).ok()
}

/// Denylist of lazy marketing phrases, matched case-insensitively on whole
/// words, so "world class" does not fire inside "underworld classics".
#[derive(Debug, Clone)]
pub struct GenericPhrases {
    phrases: Vec<String>,
    patterns: Vec<Regex>,
}

impl PartialEq for GenericPhrases {
    fn eq(&self, other: &Self) -> bool {
        self.phrases == other.phrases
    }
}

impl Eq for GenericPhrases {}

impl Default for GenericPhrases {
    fn default() -> Self {
        Self::from_phrases(DEFAULT_GENERIC_PHRASES.iter().copied())
    }
}

impl GenericPhrases {
    pub fn from_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            phrases: Vec::new(),
            patterns: Vec::new(),
        };
        list.extend(phrases);
        list
    }

    /// Add phrases, skipping blanks and duplicates.
    pub fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            let phrase = normalize(phrase.as_ref());
            if phrase.is_empty() || self.phrases.contains(&phrase) {
                continue;
            }
            let Some(pattern) = phrase_pattern(&phrase) else {
                tracing::warn!(phrase = %phrase, "skipping unmatchable generic phrase");
                continue;
            };
            self.phrases.push(phrase);
            self.patterns.push(pattern);
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Denylisted phrases occurring as whole words in `text`.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let haystack = normalize(text);
        self.phrases
            .iter()
            .zip(&self.patterns)
            .filter(|(_, pattern)| pattern.is_match(&haystack))
            .map(|(phrase, _)| phrase.as_str())
            .collect()
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Pass iff none of the inspected `fields` of the JSON object contain a
/// denylisted phrase. Fails with `MISSING` when no inspected field exists.
pub fn generic_language(
    cache: &mut ArtifactCache,
    path: &Path,
    fields: &[String],
    phrases: &GenericPhrases,
) -> CheckResult {
    let value = match cache.read_json(path) {
        Ok(value) => value,
        Err(err) => return CheckResult::fail(format!("{}: {err}", err.marker())),
    };
    let Some(object) = value.as_object() else {
        return CheckResult::fail(format!(
            "{} copy fields: {} is not a JSON object",
            markers::MISSING,
            path.display()
        ));
    };

    let present: Vec<&Value> = fields.iter().filter_map(|f| object.get(f)).collect();
    if present.is_empty() {
        return CheckResult::fail(format!(
            "{} copy fields ({}) in {}",
            markers::MISSING,
            fields.join(", "),
            path.display()
        ));
    }

    let mut texts = Vec::new();
    present.into_iter().for_each(|v| collect_strings(v, &mut texts));

    let mut hits: Vec<&str> = Vec::new();
    for text in texts {
        for phrase in phrases.matches(text) {
            if !hits.contains(&phrase) {
                hits.push(phrase);
            }
        }
    }

    if hits.is_empty() {
        CheckResult::pass(format!("Copy in {} is specific", path.display()))
    } else {
        CheckResult::fail(format!(
            "{} in {}: \"{}\"",
            markers::GENERIC_LANGUAGE,
            path.display(),
            hits.join("\", \"")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn copy_fields() -> Vec<String> {
        vec!["copy".to_string()]
    }

    // --- placeholders ---

    #[test]
    fn clean_page_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "clean.html", "<h1>Real Content</h1>");
        assert!(no_placeholder(&mut ArtifactCache::new(), &path).passed);
    }

    #[test]
    fn placeholder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "dirty.html", "<h1>{{PLACEHOLDER}}</h1>");
        let result = no_placeholder(&mut ArtifactCache::new(), &path);
        assert!(!result.passed);
        assert!(result.message.contains(markers::PLACEHOLDERS_FOUND));
        assert!(result.message.contains("{{PLACEHOLDER}}"));
    }

    #[test]
    fn placeholder_tokens_are_deduplicated_in_order() {
        let text = "{{HEADLINE}} {{CTA_TEXT}} {{HEADLINE}} {{PRICE}}";
        assert_eq!(
            find_placeholders(text),
            vec!["{{HEADLINE}}", "{{CTA_TEXT}}", "{{PRICE}}"]
        );
    }

    #[test]
    fn lowercase_and_spaced_braces_are_not_placeholders() {
        let text = "{{headline}} {{ HEADLINE }} {{}} {HEADLINE} {{HEAD1}}";
        assert!(find_placeholders(text).is_empty());
    }

    #[test]
    fn long_placeholder_list_is_elided() {
        let dir = tempfile::tempdir().unwrap();
        let text: String = (b'A'..=b'L')
            .map(|c| format!("{{{{TOKEN_{}}}}} ", c as char))
            .collect();
        let path = write(&dir, "many.html", &text);
        let result = no_placeholder(&mut ArtifactCache::new(), &path);
        assert!(!result.passed);
        assert!(result.message.contains("12 unique"));
        assert!(result.message.contains("(+2 more)"));
        assert!(!result.message.contains("{{TOKEN_L}}"));
    }

    #[test]
    fn placeholder_check_on_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = no_placeholder(&mut ArtifactCache::new(), &dir.path().join("gone.html"));
        assert!(!result.passed);
        assert!(result.message.contains(markers::FILE_NOT_FOUND));
    }

    // --- generic language ---

    #[test]
    fn specific_copy_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "unique.json", r#"{"copy": "The forbidden grail finally landed"}"#);
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(result.passed, "{}", result.message);
    }

    #[test]
    fn lazy_copy_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lazy.json", r#"{"copy": "premium quality best in class product"}"#);
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(!result.passed);
        assert!(result.message.contains(markers::GENERIC_LANGUAGE));
        assert!(result.message.contains("premium quality"));
        assert!(result.message.contains("best in class"));
    }

    #[test]
    fn matching_ignores_case_and_spacing() {
        let phrases = GenericPhrases::default();
        assert_eq!(phrases.matches("PREMIUM   Quality leather"), vec!["premium quality"]);
        assert!(phrases.matches("A quality premium").is_empty());
    }

    #[test]
    fn phrases_inside_longer_words_do_not_match() {
        let phrases = GenericPhrases::default();
        assert!(phrases.matches("underworld classics").is_empty());
        assert!(phrases.matches("a laptop notch in the wall").is_empty());
        assert_eq!(phrases.matches("Truly world-class comfort"), vec!["world-class"]);
        assert_eq!(phrases.matches("(top notch!)"), vec!["top notch"]);
    }

    #[test]
    fn embedded_phrases_pass_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let copy = serde_json::json!({
            "copy": "Tours of the underworld classics beneath Porto, \
                     sold from a laptop notch in the wall"
        });
        let path = write(&dir, "tours.json", &copy.to_string());
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(result.passed, "{}", result.message);
    }

    #[test]
    fn custom_phrases_extend_the_denylist() {
        let mut phrases = GenericPhrases::default();
        phrases.extend(["Life-Changing", "", "life-changing"]);
        assert_eq!(
            phrases.phrases().iter().filter(|p| *p == "life-changing").count(),
            1
        );
        assert_eq!(phrases.matches("a life-changing serum"), vec!["life-changing"]);
    }

    #[test]
    fn array_copy_is_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "bullets.json",
            r#"{"copy": ["Hand-stitched in Porto", "Truly world-class comfort"]}"#,
        );
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(!result.passed);
        assert!(result.message.contains("world-class"));
    }

    #[test]
    fn other_fields_are_not_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "mixed.json",
            r#"{"copy": "Forged from meteorite steel", "notes": "premium quality"}"#,
        );
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(result.passed, "{}", result.message);
    }

    #[test]
    fn missing_copy_field_fails_with_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "nocopy.json", r#"{"headline": "Whatever"}"#);
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(!result.passed);
        assert!(result.message.contains(markers::MISSING));
    }

    #[test]
    fn malformed_json_fails_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "broken.json", r#"{"copy": "unterminated"#);
        let result = generic_language(
            &mut ArtifactCache::new(),
            &path,
            &copy_fields(),
            &GenericPhrases::default(),
        );
        assert!(!result.passed);
        assert!(result.message.contains(markers::INVALID_ARTIFACT));
    }
}
