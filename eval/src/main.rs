mod case;
mod cli;
mod config;
mod outcome;
mod report;
mod results;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::report::ReportFormat;

#[derive(Parser)]
#[command(name = "eval", version, about = "Grader evaluation harness")]
struct Cli {
    /// Debug-level diagnostics on stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    List,
    Run {
        case_id: String,
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// Grader config (default: eval/grader.toml).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    Report {
        case_id: String,
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
        format: ReportFormat,
    },
    Clean {
        case_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    grading::logging::init(cli.verbose);
    let repo_root = std::env::current_dir()?;
    match cli.command {
        Command::List => cli::list_cases(&repo_root),
        Command::Run {
            case_id,
            runs,
            config,
        } => cli::run_case_by_id(&repo_root, &case_id, runs, config.as_deref()),
        Command::Report {
            case_id,
            run_id,
            format,
        } => cli::report_case(&repo_root, &case_id, run_id.as_deref(), format),
        Command::Clean { case_id } => cli::clean_case(&repo_root, &case_id),
    }
}
