//! Curator - reconciliation CLI for the quantum example library.
//!
//! Wraps curator-core for pre-commit and maintenance use: reconcile
//! metadata companions, the timeout registry, or everything at once, and
//! build the unified metadata document. Exit code 0 means a fully clean
//! run; 1 means problems were found, including problems that were just
//! repaired and need a confirming re-run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use curator_core::{repo, AggregateOptions, Curator, ReconcileConfig, Report};

#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(about = "Reconciles the example library against its metadata schema and timeout registry")]
#[command(version)]
struct Cli {
    /// Library root (defaults to the enclosing git worktree)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile metadata companions and tree-wide naming conventions
    Metadata(ScopeArgs),
    /// Reconcile the timeout registry
    Timeouts(ScopeArgs),
    /// Run every reconciliation pass over the whole tree
    Check {
        /// Repair what can be repaired instead of only reporting
        #[arg(long)]
        fix: bool,
    },
    /// Write the unified metadata document
    Aggregate {
        /// Subtree to aggregate (defaults to the library root)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output file (defaults to unified_metadata.json in the subtree)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ScopeArgs {
    /// Primary files to reconcile, relative to the library root
    paths: Vec<PathBuf>,

    /// Reconcile every file in the tree
    #[arg(long)]
    all_files: bool,

    /// Repair what can be repaired instead of only reporting
    #[arg(long)]
    fix: bool,
}

impl ScopeArgs {
    /// Absolute paths to limit per-file checks to, or `None` for the tree.
    fn scope(&self, root: &Path) -> Option<BTreeSet<PathBuf>> {
        if self.all_files || self.paths.is_empty() {
            return None;
        }
        Some(
            self.paths
                .iter()
                .map(|p| {
                    if p.is_absolute() {
                        p.clone()
                    } else {
                        root.join(p)
                    }
                })
                .collect(),
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    std::process::exit(run(&cli)?)
}

/// Runs the selected command and returns the process exit code.
fn run(cli: &Cli) -> Result<i32> {
    let root = repo::resolve_root(cli.root.as_deref())?;
    debug!("Library root: {}", root.display());

    let report = match &cli.command {
        Command::Metadata(args) => {
            let curator = curator(&root, args.fix)?;
            let mut report = curator.reconcile_metadata(args.scope(&root).as_ref())?;
            report.merge(curator.tree_checks()?);
            report
        }
        Command::Timeouts(args) => {
            let curator = curator(&root, args.fix)?;
            curator.reconcile_timeouts(args.scope(&root).as_ref())?
        }
        Command::Check { fix } => curator(&root, *fix)?.check_all(None)?,
        Command::Aggregate { dir, output } => {
            let options = AggregateOptions {
                dir: dir.clone(),
                output: output.clone(),
            };
            let summary = curator(&root, false)?.aggregate(&options)?;
            println!(
                "Wrote {} records to {}",
                summary.records,
                summary.output.display()
            );
            return Ok(0);
        }
    };

    Ok(finish(&report))
}

fn curator(root: &Path, fix: bool) -> Result<Curator> {
    let config = ReconcileConfig {
        auto_fix: fix,
        ..ReconcileConfig::default()
    };
    Ok(Curator::new(root, config)?)
}

/// Prints the report and converts it into an exit code.
fn finish(report: &Report) -> i32 {
    if report.is_clean() {
        0
    } else {
        println!("{}", report);
        println!(
            "Found {} problem(s). Fixes, if any, were applied; re-run to confirm.",
            report.problem_count()
        );
        1
    }
}
