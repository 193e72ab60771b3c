//! javadeps CLI - class-level dependencies between Java packages.
//!
//! Usage:
//!   javadeps build <dir>                  # Index extraction records under <dir>
//!   javadeps requires <pkg>...            # Packages required by <pkg>
//!   javadeps provides <pkg>               # Classes provided by <pkg>
//!   javadeps what-provides <class>        # Owner of <class>
//!   javadeps what-requires <pkg>          # Packages requiring <pkg>
//!   javadeps why <from> <to> [-t]         # Classes behind the dependency
//!   javadeps diff <pkg> --declared <file> # Declared vs. observed requirements
//!   javadeps list | stats
//!
//! Exit status: 0 answer produced, 2 not found / no dependency, 1 error.

use anyhow::{Context, Result};
use clap::Parser;
use javadeps::cli::{self, Cli};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(cli::usage_exit_code(&e));
        }
    };

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr; stdout carries only query output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = cli::run(cli, &mut out).with_context(|| match &cli.command {
        cli::Commands::Build { dir } => format!("building index from {}", dir.display()),
        _ => "query failed".to_string(),
    })?;
    Ok(outcome.exit_code())
}
