use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use gitmc::{
    Config, Error, GitBackend, OperationManager, Orchestrator, WorkflowReport, ENV_LOG_LEVEL,
};

#[derive(Parser)]
#[command(
    name = "gitmc",
    version,
    about = "Version control for Minecraft Java Edition saves"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a save: build the textual projection and both repositories
    Init { save: PathBuf },
    /// Translate changed chunks into SNBT without committing
    Translate { save: PathBuf },
    /// Translate, considering only region files modified after an ISO-8601 UTC instant
    TranslateSince { save: PathBuf, since: String },
    /// Commit translated and hand-edited changes
    Commit { save: PathBuf, message: String },
    /// Write the textual tree as of a commit into an output directory
    Reconstruct {
        save: PathBuf,
        commit: String,
        out: PathBuf,
    },
    /// Print pending and changed counts
    Status { save: PathBuf },
}

fn main() {
    let filters = std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::new().parse_filters(&filters).init();
    std::process::exit(run(Cli::parse()));
}

fn orchestrator(save: PathBuf) -> Orchestrator {
    Orchestrator::new(
        save,
        Config::from_env(),
        Box::new(GitBackend::new()),
        OperationManager::new(),
    )
    .with_progress(Box::new(|e| {
        eprintln!("[{}/{}] {}: {}", e.current, e.total, e.step_name, e.message);
    }))
}

fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Init { save } => match orchestrator(save).initialize() {
            Ok(report) => {
                print_report(&report);
                println!(
                    "initialized: {} files imported as {}",
                    report.exported,
                    report.commit.as_deref().unwrap_or("?")
                );
                0
            }
            Err(e @ Error::IdentityMissing) => fail(&e, 2),
            Err(e @ Error::NotASave(_)) => fail(&e, 3),
            Err(e @ Error::AlreadyInitialized(_)) => fail(&e, 4),
            Err(e) => fail(&e, 1),
        },
        Command::Translate { save } => translate_outcome(orchestrator(save).translate()),
        Command::TranslateSince { save, since } => {
            let since = match DateTime::parse_from_rfc3339(&since) {
                Ok(t) => t.with_timezone(&Utc),
                Err(e) => {
                    eprintln!("error: invalid timestamp {since:?}: {e}");
                    return 5;
                }
            };
            translate_outcome(orchestrator(save).translate_since(since))
        }
        Command::Commit { save, message } => match orchestrator(save).commit(&message) {
            Ok(report) => {
                print_report(&report);
                println!("committed {}", report.commit.as_deref().unwrap_or("?"));
                0
            }
            Err(e @ Error::NothingToCommit) => {
                eprintln!("{e}");
                6
            }
            Err(e) => fail(&e, 7),
        },
        Command::Reconstruct { save, commit, out } => {
            match orchestrator(save).reconstruct(&commit, &out) {
                Ok(report) if report.missing.is_empty() => {
                    println!("reconstructed {} files", report.written);
                    0
                }
                Ok(report) => {
                    for path in &report.missing {
                        eprintln!("missing: {path}");
                    }
                    eprintln!(
                        "{} of {} paths unavailable",
                        report.missing.len(),
                        report.written + report.missing.len()
                    );
                    9
                }
                Err(e @ Error::CommitNotFound(_)) => fail(&e, 8),
                Err(e) => fail(&e, 1),
            }
        }
        Command::Status { save } => match orchestrator(save).status() {
            Ok(summary) => {
                println!("pending manifest entries: {}", summary.pending);
                println!("changed chunks:           {}", summary.changed_chunks);
                println!("deleted chunks:           {}", summary.deleted_chunks);
                println!("changed data files:       {}", summary.changed_files);
                println!("hand-edited snbt files:   {}", summary.core_edited);
                0
            }
            Err(e) => fail(&e, 1),
        },
    }
}

fn translate_outcome(result: gitmc::Result<WorkflowReport>) -> i32 {
    match result {
        Ok(report) => {
            print_report(&report);
            if report.is_clean() {
                println!("translated {} files", report.exported);
                0
            } else {
                5
            }
        }
        Err(e) => fail(&e, 5),
    }
}

fn print_report(report: &WorkflowReport) {
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &report.errors {
        eprintln!("error: {error}");
    }
}

fn fail(e: &Error, code: i32) -> i32 {
    eprintln!("error: {e}");
    code
}
