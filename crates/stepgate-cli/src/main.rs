//! CLI binary for gating pipeline steps and checking their artifacts.
//!
//! Exit codes: 0 when the check, gate or build passes, 1 when it fails, and 2
//! when the invocation itself is wrong (unknown check, bad arguments, broken
//! configuration).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use stepgate_engine::{default_registry, EngineConfig, VerificationSession};
use stepgate_types::CheckResult;

#[derive(Parser)]
#[command(
    name = "stepgate",
    version,
    about = "Gate pipeline steps on artifact checks and completed prerequisites"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root; relative artifact paths resolve against it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Configuration file (default: <root>/stepgate.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress record, overriding the configured one
    #[arg(long, global = true)]
    progress: Option<PathBuf>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one named check
    Check {
        /// Check name (see `stepgate checks`)
        name: String,

        /// Positional arguments for the check
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Decide whether a step's prerequisites are complete
    Gate {
        /// Step identifier, e.g. 2F-strategist
        step: String,
    },

    /// Show completed, ready and blocked steps
    Status,

    /// Show the dependency table and its lint findings
    Graph,

    /// Validate the generated page before deployment
    Build {
        /// Page to validate (default: the configured build page)
        page: Option<PathBuf>,
    },

    /// List the available checks
    Checks,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries verdicts only.
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

/// Execute the command; `Ok(false)` is a failed verdict.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    if let Commands::Checks = cli.command {
        cmd_checks(cli.json)?;
        return Ok(true);
    }

    let mut session = open_session(cli)?;
    match &cli.command {
        Commands::Check { name, args } => cmd_check(&mut session, name, args, cli.json),
        Commands::Gate { step } => {
            cmd_check(&mut session, "previous_step_passed", std::slice::from_ref(step), cli.json)
        }
        Commands::Status => cmd_status(&mut session, cli.json),
        Commands::Graph => cmd_graph(&session, cli.json),
        Commands::Build { page } => cmd_build(&mut session, page.as_deref(), cli.json),
        Commands::Checks => Ok(true),
    }
}

fn open_session(cli: &Cli) -> anyhow::Result<VerificationSession> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::discover(&cli.root)?,
    };
    if let Some(progress) = &cli.progress {
        config.progress_file = progress.clone();
    }
    tracing::debug!(
        root = %cli.root.display(),
        config = ?cli.config,
        progress = %config.progress_file.display(),
        "opening verification session"
    );
    VerificationSession::with_config(cli.root.clone(), config)
        .with_context(|| format!("cannot open session at {}", cli.root.display()))
}

fn print_result(result: &CheckResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{result}");
    }
    Ok(())
}

fn cmd_check(
    session: &mut VerificationSession,
    name: &str,
    args: &[String],
    json: bool,
) -> anyhow::Result<bool> {
    let result = default_registry().run(session, name, args)?;
    print_result(&result, json)?;
    Ok(result.passed)
}

fn cmd_checks(json: bool) -> anyhow::Result<()> {
    let registry = default_registry();
    if json {
        let listing: BTreeMap<&str, &str> =
            registry.iter().map(|c| (c.name(), c.usage())).collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }
    for check in registry.iter() {
        println!("  {:<24} {}", check.name(), check.usage());
    }
    Ok(())
}

fn cmd_status(session: &mut VerificationSession, json: bool) -> anyhow::Result<bool> {
    let progress = session.load_progress();
    let completed = progress.completed();
    let graph = session.graph();
    let ready: Vec<&str> = graph.ready_steps(&completed).iter().map(|s| s.as_str()).collect();
    let blocked: BTreeMap<&str, Vec<&str>> = graph
        .steps()
        .filter(|s| !completed.contains(s.as_str()) && !ready.contains(&s.as_str()))
        .map(|s| {
            let missing = graph
                .missing_prerequisites(s.as_str(), &completed)
                .into_iter()
                .map(|p| p.as_str())
                .collect();
            (s.as_str(), missing)
        })
        .collect();

    if json {
        let value = json!({
            "progress_file": session.progress_path(),
            "completed": progress.entries(),
            "ready": ready,
            "blocked": blocked,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(true);
    }

    println!("Progress: {}", session.progress_path().display());
    println!("\nCompleted ({}):", progress.len());
    for entry in progress.entries() {
        match entry.completed_at {
            Some(at) => println!("  {} ({})", entry.step, at.to_rfc3339()),
            None => println!("  {}", entry.step),
        }
    }
    println!("\nReady ({}):", ready.len());
    for step in &ready {
        println!("  {step}");
    }
    println!("\nBlocked ({}):", blocked.len());
    for (step, missing) in &blocked {
        println!("  {step} <- waiting on {}", missing.join(", "));
    }
    Ok(true)
}

fn cmd_graph(session: &VerificationSession, json: bool) -> anyhow::Result<bool> {
    let graph = session.graph();
    let diagnostics = session.diagnostics();

    if json {
        let value = json!({
            "dependencies": graph,
            "diagnostics": diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(true);
    }

    println!("Steps: {}", graph.len());
    for step in graph.topological_order()? {
        let prereqs: Vec<&str> = graph
            .prerequisites(step.as_str())
            .into_iter()
            .flatten()
            .map(|p| p.as_str())
            .collect();
        if prereqs.is_empty() {
            println!("  {step}");
        } else {
            println!("  {step} <- {}", prereqs.join(", "));
        }
    }

    if diagnostics.is_empty() {
        println!("\nDependency table is valid");
    } else {
        println!();
        for diag in diagnostics {
            println!("{diag}");
        }
    }
    Ok(true)
}

fn cmd_build(
    session: &mut VerificationSession,
    page: Option<&Path>,
    json: bool,
) -> anyhow::Result<bool> {
    let report = session.validate_build(page);
    let passed = report.passed();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(passed);
    }

    println!("Validating {}", report.page.display());
    for diag in report.warnings() {
        println!("  {diag}");
    }
    for diag in report.errors() {
        println!("  {diag}");
    }
    if passed {
        println!("\nVALIDATION PASSED - ready for deployment");
    } else {
        println!("\nVALIDATION FAILED - fix errors before deployment");
    }
    Ok(passed)
}
