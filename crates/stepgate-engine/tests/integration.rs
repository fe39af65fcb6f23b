//! End-to-end tests for the step verification engine.
//!
//! Each test lays out a pipeline workspace in a temp dir, opens a session on it,
//! and dispatches checks by name the way a pipeline driver would.

use std::path::Path;

use serde_json::json;
use stepgate_engine::{default_registry, CheckRegistry, Severity, VerificationSession};
use stepgate_types::{markers, CheckResult};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Workspace {
    dir: tempfile::TempDir,
    registry: CheckRegistry,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            registry: default_registry(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn progress(&self, steps: &[&str]) {
        let entries: Vec<_> = steps.iter().map(|s| json!({"step": s})).collect();
        self.write(
            "progress.json",
            &json!({"steps_completed": entries}).to_string(),
        );
    }

    fn session(&self) -> VerificationSession {
        VerificationSession::new(self.root()).expect("session")
    }

    fn check(&self, session: &mut VerificationSession, name: &str, args: &[&str]) -> CheckResult {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.registry
            .run(session, name, &args)
            .unwrap_or_else(|err| panic!("{name} misused: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Gate scenarios
// ---------------------------------------------------------------------------

#[test]
fn research_cluster_starts_in_parallel_after_initialize() {
    let ws = Workspace::new();
    ws.progress(&["1-initialize"]);
    let mut session = ws.session();

    for step in ["2A-scout", "2C-profiler", "2E-mechanic"] {
        let result = ws.check(&mut session, "previous_step_passed", &[step]);
        assert!(result.passed, "{step} should start: {}", result.message);
    }
}

#[test]
fn strategist_requires_every_research_step() {
    let ws = Workspace::new();
    ws.progress(&["1-initialize", "2A-scout", "2B-spy"]);
    let mut session = ws.session();

    let result = ws.check(&mut session, "previous_step_passed", &["2F-strategist"]);
    assert!(!result.passed);
    assert!(result.message.contains(markers::NOT_COMPLETE));
    for missing in ["2C-profiler", "2D-avatar", "2E-mechanic"] {
        assert!(result.message.contains(missing), "{}", result.message);
    }
}

#[test]
fn no_progress_file_means_nothing_completed() {
    let ws = Workspace::new();
    let mut session = ws.session();

    assert!(ws.check(&mut session, "previous_step_passed", &["1-initialize"]).passed);
    assert!(!ws.check(&mut session, "previous_step_passed", &["2A-scout"]).passed);
}

#[test]
fn walking_the_pipeline_with_clear_between_steps() {
    let ws = Workspace::new();
    let mut session = ws.session();
    let order = [
        "1-initialize",
        "2A-scout",
        "2B-spy",
        "2C-profiler",
        "2D-avatar",
        "2E-mechanic",
        "2F-strategist",
        "3-copywriter",
        "4-builder",
        "5-auditor",
    ];

    let mut done: Vec<&str> = Vec::new();
    for step in order {
        session.clear_cache();
        let result = ws.check(&mut session, "previous_step_passed", &[step]);
        assert!(result.passed, "{step}: {}", result.message);
        done.push(step);
        ws.progress(&done);
    }
}

// ---------------------------------------------------------------------------
// Artifact checks
// ---------------------------------------------------------------------------

#[test]
fn driver_style_artifact_checks() {
    let ws = Workspace::new();
    ws.write("research/scout.json", r#"{"competitors": [], "summary": ""}"#);
    ws.write("copy/draft.json", r#"{"copy": "Boots resoled by the same cobbler for 30 years"}"#);
    ws.write("audit/report.md", "# Audit\n\nHALLUCINATION_CHECK: PASSED\n");
    ws.write("index.html", &format!("<h1>Real Content</h1>{}", " ".repeat(2048)));
    let mut session = ws.session();

    assert!(ws.check(&mut session, "has_key", &["research/scout.json", "summary"]).passed);
    assert!(ws.check(&mut session, "generic_language", &["copy/draft.json"]).passed);
    let audit = ["audit/report.md", "HALLUCINATION_CHECK: PASSED"];
    assert!(ws.check(&mut session, "contains_text", &audit).passed);
    assert!(ws.check(&mut session, "no_placeholder", &["index.html"]).passed);
    assert!(ws.check(&mut session, "file_exists_and_valid", &["index.html", "2"]).passed);
}

#[test]
fn failure_markers_distinguish_categories() {
    let ws = Workspace::new();
    ws.write("tiny.txt", "x");
    ws.write("data.json", r#"{"other_key": 1}"#);
    ws.write("page.html", "<h1>{{HEADLINE}}</h1>");
    ws.write("lazy.json", r#"{"copy": "premium quality best in class product"}"#);
    ws.write("report.md", "HALLUCINATION_CHECK: FAILED");
    let mut session = ws.session();

    let cases: [(&str, &[&str], &str); 6] = [
        ("file_exists_and_valid", &["tiny.txt", "1"], markers::TOO_SMALL),
        ("file_exists_and_valid", &["absent.txt"], markers::FILE_NOT_FOUND),
        ("has_key", &["data.json", "expected_key"], markers::MISSING),
        ("no_placeholder", &["page.html"], markers::PLACEHOLDERS_FOUND),
        ("generic_language", &["lazy.json"], markers::GENERIC_LANGUAGE),
        ("contains_text", &["report.md", "HALLUCINATION_CHECK: PASSED"], markers::TEXT_NOT_FOUND),
    ];
    for (name, args, marker) in cases {
        let result = ws.check(&mut session, name, args);
        assert!(!result.passed, "{name} should fail");
        assert!(result.message.contains(marker), "{name}: {}", result.message);
    }
}

#[test]
fn malformed_json_never_aborts() {
    let ws = Workspace::new();
    ws.write("broken.json", "{\"copy\": ");
    ws.write("progress.json", "not json");
    let mut session = ws.session();

    let key = ws.check(&mut session, "has_key", &["broken.json", "copy"]);
    assert!(!key.passed);
    assert!(key.message.contains(markers::INVALID_ARTIFACT));

    let copy = ws.check(&mut session, "generic_language", &["broken.json"]);
    assert!(!copy.passed);

    assert!(ws.check(&mut session, "previous_step_passed", &["1-initialize"]).passed);
    assert!(!ws.check(&mut session, "previous_step_passed", &["2A-scout"]).passed);
}

// ---------------------------------------------------------------------------
// Cache behaviour
// ---------------------------------------------------------------------------

#[test]
fn results_are_idempotent_across_clear() {
    let ws = Workspace::new();
    ws.write("page.html", "<h1>{{HEADLINE}}</h1>");
    ws.progress(&["1-initialize", "2A-scout"]);
    let mut session = ws.session();

    let run = |session: &mut VerificationSession| {
        (
            ws.check(session, "no_placeholder", &["page.html"]),
            ws.check(session, "previous_step_passed", &["2F-strategist"]),
        )
    };

    let first = run(&mut session);
    let second = run(&mut session);
    session.clear_cache();
    let third = run(&mut session);

    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn clear_exposes_current_disk_state() {
    let ws = Workspace::new();
    ws.write("page.html", "<h1>{{HEADLINE}}</h1>");
    ws.progress(&["1-initialize"]);
    let mut session = ws.session();

    assert!(!ws.check(&mut session, "no_placeholder", &["page.html"]).passed);
    assert!(!ws.check(&mut session, "previous_step_passed", &["2F-strategist"]).passed);

    ws.write("page.html", "<h1>Boots that outlast the trail</h1>");
    ws.progress(&[
        "1-initialize",
        "2A-scout",
        "2B-spy",
        "2C-profiler",
        "2D-avatar",
        "2E-mechanic",
    ]);

    // Same invocation: the cached view still applies.
    assert!(!ws.check(&mut session, "no_placeholder", &["page.html"]).passed);

    session.clear_cache();
    assert!(ws.check(&mut session, "no_placeholder", &["page.html"]).passed);
    assert!(ws.check(&mut session, "previous_step_passed", &["2F-strategist"]).passed);
}

#[test]
fn repeated_checks_read_each_file_once() {
    let ws = Workspace::new();
    ws.write("data.json", r#"{"a": 1, "b": 2}"#);
    let mut session = ws.session();

    for key in ["a", "b", "c"] {
        ws.check(&mut session, "has_key", &["data.json", key]);
    }
    let stats = session.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

// ---------------------------------------------------------------------------
// Configuration and build validation
// ---------------------------------------------------------------------------

#[test]
fn configured_dependency_table_drives_the_gate() {
    let ws = Workspace::new();
    ws.write(
        "stepgate.json",
        &json!({
            "progress_file": "state/progress.json",
            "dependencies": {
                "draft": [],
                "legal": ["draft"],
                "seo": ["draft"],
                "publish": ["legal", "seo"]
            }
        })
        .to_string(),
    );
    ws.write(
        "state/progress.json",
        r#"{"steps_completed": [{"step": "draft"}, {"step": "seo"}]}"#,
    );
    let mut session = ws.session();

    assert!(ws.check(&mut session, "previous_step_passed", &["legal"]).passed);
    let publish = ws.check(&mut session, "previous_step_passed", &["publish"]);
    assert!(!publish.passed);
    assert!(publish.message.contains("legal"));
    // The standard table no longer applies.
    assert!(ws.check(&mut session, "previous_step_passed", &["2F-strategist"]).passed);
}

#[test]
fn build_validation_through_session() {
    let ws = Workspace::new();
    ws.write(
        "index.html",
        r#"<section class="hero"><h1>Trail boots</h1><img src="images/hero.webp"></section>"#,
    );
    let mut session = ws.session();

    let report = session.validate_build(None);
    assert!(!report.passed());
    let errors: Vec<&str> = report.errors().map(|d| d.message.as_str()).collect();
    assert_eq!(errors, vec!["Missing image: images/hero.webp"]);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.rule == "page_size" && d.severity == Severity::Warning));

    ws.write("images/hero.webp", "webp");
    session.clear_cache();
    assert!(session.validate_build(None).passed());
}
