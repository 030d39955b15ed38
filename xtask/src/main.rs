//! Development automation tasks for the `Tollgate` workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! intentionally used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context};

mod features;

type Task = fn() -> anyhow::Result<()>;

/// Steps run by `cargo xtask ci`, in order.
const CI_STEPS: &[(&str, Task)] = &[
    ("Checking Rust format", run_fmt),
    ("Running Clippy", run_clippy),
    ("Running tests", run_test),
    ("Running dispatch scenarios serially", run_scenarios),
    ("Building benchmarks and examples", run_build_extras),
    ("Checking dependencies", run_deny),
    ("Auditing dependencies", run_audit),
];

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("scenarios") => run_scenarios(),
        Some("directives") => run_directives(),
        Some("bench") => run_build_extras(),
        Some("deny") => run_deny(),
        Some("audit") => run_audit(),
        Some("test-features") => features::test_feature_matrix(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("Tollgate Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci             Run every CI step in order");
    println!("    fmt            Check Rust code formatting");
    println!("    clippy         Run Clippy lints");
    println!("    test           Run all tests (all features, so core test-utils suites run)");
    println!("    scenarios      Run the timing-sensitive dispatch scenarios one at a time");
    println!("    directives     Run the core endpoint directive suite with test-utils");
    println!("    bench          Build the criterion benchmarks and the infra example");
    println!("    test-features  Verify tollgate-core / tollgate-infra feature matrix compiles");
    println!("    deny           Check dependencies with cargo-deny");
    println!("    audit          Audit dependencies for security vulnerabilities");
    println!("    help           Show this help message");
}

/// Run all CI checks in sequence
fn run_ci() -> anyhow::Result<()> {
    println!("==> Running CI checks...");

    for (index, (label, step)) in CI_STEPS.iter().enumerate() {
        println!("\n==> Step {}/{}: {label}...", index + 1, CI_STEPS.len());
        step()?;
    }

    println!("\n✓ All CI checks passed!");
    Ok(())
}

/// Run `cargo <args>` and fail with `failure` on a non-zero exit.
fn cargo(args: &[&str], failure: &str) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to spawn cargo {}", args.join(" ")))?;

    if !status.success() {
        bail!("{failure}");
    }

    Ok(())
}

/// Fail early with an install hint when a cargo subcommand is missing.
fn require_cargo_tool(tool: &str) -> anyhow::Result<()> {
    let installed = Command::new("cargo")
        .args([tool, "--version"])
        .output()
        .is_ok_and(|output| output.status.success());

    if !installed {
        eprintln!("cargo-{tool} is not installed.");
        eprintln!("Install it with: cargo install cargo-{tool}");
        bail!("cargo-{tool} not found");
    }

    Ok(())
}

/// Check Rust code formatting
fn run_fmt() -> anyhow::Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "Format check failed. Run 'cargo fmt --all' to fix.")
}

/// Run Clippy lints
fn run_clippy() -> anyhow::Result<()> {
    cargo(&["clippy", "--all-targets", "--all-features"], "Clippy run failed. See output above.")
}

/// Run all workspace tests
fn run_test() -> anyhow::Result<()> {
    cargo(&["test", "--workspace", "--all-features"], "Tests failed")
}

/// Coalescing scenarios assert on wall-clock overlap with a 200ms transport,
/// so they run one test at a time.
fn run_scenarios() -> anyhow::Result<()> {
    cargo(
        &["test", "-p", "tollgate-infra", "--test", "dispatch_scenarios", "--", "--test-threads=1"],
        "Dispatch scenarios failed",
    )
}

/// Gated on `test-utils`; a plain `cargo test` skips it.
fn run_directives() -> anyhow::Result<()> {
    cargo(
        &["test", "-p", "tollgate-core", "--features", "test-utils", "--test", "endpoint_directives"],
        "Endpoint directive tests failed",
    )
}

/// Build the criterion benchmarks and the infra example so they cannot rot
fn run_build_extras() -> anyhow::Result<()> {
    cargo(&["bench", "-p", "tollgate-core", "--no-run"], "Benchmark build failed")?;
    cargo(
        &["build", "-p", "tollgate-infra", "--example", "fetch_customer_info"],
        "Example build failed",
    )
}

/// Check dependencies with cargo-deny
fn run_deny() -> anyhow::Result<()> {
    require_cargo_tool("deny")?;
    cargo(&["deny", "check"], "cargo-deny found issues")
}

/// Audit dependencies for security vulnerabilities
fn run_audit() -> anyhow::Result<()> {
    require_cargo_tool("audit")?;
    cargo(&["audit"], "cargo-audit found vulnerabilities")
}
