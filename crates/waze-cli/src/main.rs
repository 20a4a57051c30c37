mod discover;
mod scan;
mod size;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, ArgAction, Parser, ValueEnum};
use waze_pack::{Strategy, Thresholds, MAX_DETAILS};

use scan::{print_report, scan_packs, RepoReport, ScanOptions};
use size::parse_size;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// On-disk (compressed) sizes from the index alone
    Index,
    /// Uncompressed sizes from each entry header in the pack
    Pack,
}

impl From<Mode> for Strategy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Index => Strategy::IndexOnly,
            Mode::Pack => Strategy::PackAware,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "git-waze",
    about = "Find oversized objects in git pack files",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Repositories to scan (git directory, bare repository or work tree)
    #[arg(required = true, value_name = "GIT_DIR")]
    repos: Vec<PathBuf>,

    /// Report objects larger than this (k, m, g suffixes allowed)
    #[arg(long, default_value = "50m", value_parser = parse_size)]
    warn: u64,

    /// Fail packs holding objects larger than this
    #[arg(long, default_value = "100m", value_parser = parse_size)]
    limit: u64,

    /// Number of objects listed per repository
    #[arg(long, default_value_t = MAX_DETAILS)]
    max_details: usize,

    /// Cap on buffers read from a single index
    #[arg(long, default_value = "256m", value_parser = parse_size)]
    memlimit: u64,

    /// How object sizes are measured
    #[arg(long, value_enum, default_value_t = Mode::Index)]
    mode: Mode,

    /// Number of packs analyzed in parallel
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Stop scanning a repository at its first rejected or unreadable pack
    /// (with -j > 1, packs already in progress still finish)
    #[arg(long)]
    fail_fast: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => process::exit(0),
                _ => process::exit(128),
            }
        }
    };

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("fatal: {e:#}");
            process::exit(128);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    if let Some(jobs) = cli.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("cannot start worker pool")?;
        pool.install(|| scan_all(cli))
    } else {
        scan_all(cli)
    }
}

fn scan_all(cli: &Cli) -> Result<i32> {
    let thresholds = Thresholds::new(cli.warn, cli.limit);
    let options = ScanOptions {
        strategy: cli.mode.into(),
        thresholds,
        max_details: cli.max_details,
        memlimit: cli.memlimit,
        fail_fast: cli.fail_fast,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut code = 0;

    for repo in &cli.repos {
        let report = match scan_repository(repo, &options) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(repo = %repo.display(), "{e:#}");
                writeln!(out, "{}:\n  error: {e:#}", repo.display())?;
                code = 1;
                continue;
            }
        };
        print_report(&mut out, &report, thresholds)?;
        if !report.passed() {
            code = 1;
        }
    }

    out.flush()?;
    Ok(code)
}

fn scan_repository(repo: &Path, options: &ScanOptions) -> Result<RepoReport> {
    let git_dir = discover::resolve_git_dir(repo)?;
    let packs = discover::find_packs(&git_dir)?;
    tracing::info!(repo = %git_dir.display(), packs = packs.len(), "scanning repository");
    Ok(scan_packs(&git_dir, &packs, options))
}
