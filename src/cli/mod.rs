//! CLI module for javadeps.
//!
//! Commands:
//! - Index: build
//! - Query: requires, provides, what-provides, what-requires, why, diff
//! - Inspect: list, stats
//!
//! Query output goes to the given writer (stdout in the binary); logs go to
//! stderr through tracing.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::DepsConfig;
use crate::error::{DepsError, Result};
use crate::graph::{build_index, DependencyIndex, QueryEngine};
use crate::query::{self, QueryResponse};
use crate::source::{ManifestSource, NameNormalizer};

#[derive(Debug, Parser)]
#[command(name = "javadeps", version)]
#[command(about = "Java class-level dependencies between distribution packages")]
pub struct Cli {
    /// Index store (default: `database` from the config, else packages.dep)
    #[arg(short = 'z', long, global = true)]
    pub database: Option<PathBuf>,

    /// Config file (default: ./javadeps.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON responses instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    // ─── Index ──────────────────────────────────────────────────────
    /// Scan a directory of extraction records and write the index store
    Build {
        /// Directory to scan
        dir: PathBuf,
    },

    // ─── Query ──────────────────────────────────────────────────────
    /// Packages required by each given package, plus unresolved classes
    Requires {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Classes provided by a package
    Provides { package: String },

    /// Package that provides a class (dotted or slash form)
    WhatProvides { class: String },

    /// Packages that require a package
    WhatRequires { package: String },

    /// Classes that make one package require another
    Why {
        from: String,
        to: String,

        /// Also show the shortest dependency chain
        #[arg(short, long)]
        transitive: bool,
    },

    /// Compare declared requirements with the observed ones
    Diff {
        package: String,

        /// File with one declared package per line, or `-` for stdin
        #[arg(short, long)]
        declared: String,
    },

    // ─── Inspect ────────────────────────────────────────────────────
    /// List every indexed package
    List,

    /// Show index statistics
    Stats {
        /// Most-required packages to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },
}

/// How a command ended, for the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An answer was produced.
    Answered,
    /// Unknown package or class, or no dependency between the packages.
    NotFound,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Answered => 0,
            Outcome::NotFound => 2,
        }
    }
}

/// Exit code for a command line clap refused to parse. Help and version
/// requests are successful runs; anything else is a usage error.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Execute one command, writing its output to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<Outcome> {
    let mut config = DepsConfig::discover(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }

    match &cli.command {
        Commands::Build { dir } => run_build(&config, dir, cli.json, out),
        command => {
            let index = DependencyIndex::load(&config.database)?;
            run_query(command, &QueryEngine::new(&index), &config, cli.json, out)
        }
    }
}

fn run_query<W: Write>(
    command: &Commands,
    engine: &QueryEngine<'_>,
    config: &DepsConfig,
    json: bool,
    out: &mut W,
) -> Result<Outcome> {
    match command {
        Commands::Build { .. } => Err(DepsError::Usage("build does not query an index".into())),
        Commands::Requires { packages } => {
            let names: Vec<&str> = packages.iter().map(String::as_str).collect();
            emit(out, &query::query_requires(engine, &names), json)
        }
        Commands::Provides { package } => emit(out, &query::query_provides(engine, package), json),
        Commands::WhatProvides { class } => {
            emit(out, &query::query_what_provides(engine, class), json)
        }
        Commands::WhatRequires { package } => {
            emit(out, &query::query_what_requires(engine, package), json)
        }
        Commands::Why {
            from,
            to,
            transitive,
        } => emit(out, &query::query_why(engine, from, to, *transitive), json),
        Commands::Diff { package, declared } => {
            let naming = NameNormalizer::new(&config.naming)?;
            let declared = if declared == "-" {
                query::read_declared(io::stdin().lock(), &naming)?
            } else {
                let file = File::open(declared)
                    .map_err(|e| DepsError::Usage(format!("cannot open {}: {}", declared, e)))?;
                query::read_declared(BufReader::new(file), &naming)?
            };
            emit(out, &query::query_diff(engine, &declared, package), json)
        }
        Commands::List => emit(out, &query::query_list(engine), json),
        Commands::Stats { top } => emit(out, &query::query_stats(engine, *top), json),
    }
}

fn run_build<W: Write>(config: &DepsConfig, dir: &Path, json: bool, out: &mut W) -> Result<Outcome> {
    let source = ManifestSource::from_config(config)?;
    let (index, report) = build_index(dir, &source, config.build.batch_size)?;
    index.save(&config.database)?;
    info!(database = %config.database.display(), "build complete");

    if json {
        serde_json::to_writer_pretty(&mut *out, &report).map_err(io::Error::from)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", report)?;
    }
    Ok(Outcome::Answered)
}

fn emit<W: Write, R: QueryResponse>(out: &mut W, response: &R, json: bool) -> Result<Outcome> {
    if json {
        serde_json::to_writer_pretty(&mut *out, response).map_err(io::Error::from)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", response)?;
    }
    Ok(if response.found() {
        Outcome::Answered
    } else {
        Outcome::NotFound
    })
}
