//! Development automation tasks for the `calgrid` workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! intentionally used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::{env, fs};

use anyhow::{Context, Result};

mod features;

/// Directory the UI imports the calendar model from
const BINDINGS_DIR: &str = "bindings/generated";

/// Domain types the UI consumes; codegen fails if any binding is missing
const EXPECTED_BINDINGS: &[&str] = &[
    "BusinessHours",
    "BusinessHoursConfig",
    "DateInput",
    "Event",
    "EventUpdate",
    "Frequency",
    "GridLayout",
    "GridMetrics",
    "GridUnit",
    "HourRange",
    "MutationScope",
    "PositionedEvent",
    "RawEvent",
    "RecurrenceRule",
    "RecurrenceRulePatch",
];

/// Criterion suites in `calgrid-core`
const BENCHES: &[&str] = &["layout_engine"];

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let task = args.next();
    let rest: Vec<String> = args.collect();

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("bench") => run_bench(&rest),
        Some("codegen") => run_codegen(),
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
            eprintln!("Task failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("Calgrid Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK> [ARGS]");
    println!();
    println!("TASKS:");
    println!("    ci             Run fmt, clippy, tests and the feature matrix");
    println!("    fmt            Check Rust code formatting");
    println!("    clippy         Run Clippy lints");
    println!("    test           Run all tests");
    println!("    bench [NAME]   Run criterion suites ({})", BENCHES.join(", "));
    println!("                   Extra args after NAME go to criterion, e.g.");
    println!("                   `cargo xtask bench layout_engine --save-baseline main`");
    println!("    codegen        Write TypeScript bindings to {BINDINGS_DIR}");
    println!("    test-features  Verify every crate/feature combination compiles");
    println!("    help           Show this help message");
}

/// Run `cargo <args>`, failing with `failure` on a non-zero exit.
fn cargo(args: &[&str], failure: &str) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("{failure}");
    }
    Ok(())
}

/// Run all CI checks in sequence
fn run_ci() -> Result<()> {
    println!("==> Running CI checks...\n");

    println!("==> Step 1/4: Checking Rust format...");
    run_fmt()?;

    println!("\n==> Step 2/4: Running Clippy...");
    run_clippy()?;

    println!("\n==> Step 3/4: Running tests...");
    run_test()?;

    println!("\n==> Step 4/4: Checking feature combinations...");
    features::test_feature_matrix()?;

    println!("\n✓ All CI checks passed!");
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo(
        &["fmt", "--all", "--", "--check"],
        "Format check failed. Run 'cargo fmt --all' to fix.",
    )
}

fn run_clippy() -> Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--all-features", "--", "-D", "warnings"],
        "Clippy run failed. See output above.",
    )
}

fn run_test() -> Result<()> {
    cargo(&["test", "--workspace", "--all-features"], "Tests failed")
}

/// Run one criterion suite (or all of them) from `calgrid-core`.
///
/// Benches are compiled with the workspace `bench` profile, so numbers are
/// only comparable between runs of this task.
fn run_bench(args: &[String]) -> Result<()> {
    let (suites, passthrough): (Vec<&str>, &[String]) = match args.split_first() {
        Some((name, rest)) if !name.starts_with('-') => {
            if !BENCHES.contains(&name.as_str()) {
                anyhow::bail!("Unknown bench '{name}'. Available: {}", BENCHES.join(", "));
            }
            (vec![name.as_str()], rest)
        }
        _ => (BENCHES.to_vec(), args),
    };

    for suite in suites {
        println!("==> Running bench {suite}...");
        let mut command = vec!["bench", "-p", "calgrid-core", "--bench", suite];
        if !passthrough.is_empty() {
            command.push("--");
            command.extend(passthrough.iter().map(String::as_str));
        }
        cargo(&command, &format!("Bench '{suite}' failed"))?;
    }
    Ok(())
}

/// Export the domain model with ts-rs straight into [`BINDINGS_DIR`] and
/// write an `index.ts` re-exporting every type.
fn run_codegen() -> Result<()> {
    println!("==> Generating TypeScript types from Rust...\n");

    let out_dir = env::current_dir()
        .context("Failed to read working directory")?
        .join(BINDINGS_DIR);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    println!("Step 1/3: Running ts-gen export tests...");
    let status = Command::new("cargo")
        .args(["test", "-p", "calgrid-domain", "--features", "ts-gen", "--lib", "export_bindings"])
        .env("TS_RS_EXPORT_DIR", &out_dir)
        .status()
        .context("Failed to run cargo test")?;
    if !status.success() {
        anyhow::bail!("TypeScript generation tests failed");
    }

    println!("\nStep 2/3: Checking generated bindings...");
    let generated = binding_names(&out_dir)?;
    let missing: Vec<&str> = EXPECTED_BINDINGS
        .iter()
        .copied()
        .filter(|name| !generated.iter().any(|found| found == name))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("Missing bindings in {}: {}", out_dir.display(), missing.join(", "));
    }
    println!("  {} bindings present", generated.len());

    println!("\nStep 3/3: Generating index.ts...");
    write_index(&out_dir, &generated)?;

    println!("\n✓ TypeScript type generation complete!");
    println!("  Generated files: {}", PathBuf::from(BINDINGS_DIR).display());
    Ok(())
}

/// Sorted type names of the `.ts` files in `dir`, excluding `index.ts`.
fn binding_names(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read bindings directory {}", dir.display()))?;

    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension()?.to_str()? != "ts" {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            (stem != "index").then(|| stem.to_string())
        })
        .collect();
    names.sort();
    Ok(names)
}

fn write_index(dir: &Path, names: &[String]) -> Result<()> {
    let index_path = dir.join("index.ts");

    let mut content = String::from(
        "// Calendar data model generated from calgrid-domain\n\
         // Regenerate with: cargo xtask codegen\n\n",
    );
    for name in names {
        let _ = writeln!(content, "export type {{ {name} }} from './{name}';");
    }

    fs::write(&index_path, content)
        .with_context(|| format!("Failed to write {}", index_path.display()))?;
    println!("  Generated index.ts with {} exports", names.len());
    Ok(())
}
