//! Scanning every pack of a repository and reporting the result.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use rayon::prelude::*;
use waze_pack::{AnalysisError, Analyzer, ScanResult, Strategy, Thresholds};

use crate::discover::PackPair;
use crate::size::format_size;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub strategy: Strategy,
    pub thresholds: Thresholds,
    pub max_details: usize,
    pub memlimit: u64,
    pub fail_fast: bool,
}

/// Outcome of scanning one repository.
#[derive(Debug)]
pub struct RepoReport {
    pub git_dir: PathBuf,
    pub result: ScanResult,
    pub packs: usize,
    /// Packs with at least one object above the limit.
    pub rejected: Vec<PathBuf>,
    /// Packs that could not be analyzed.
    pub failed: Vec<(PathBuf, AnalysisError)>,
    pub skipped: usize,
}

impl RepoReport {
    pub fn passed(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }
}

/// Analyze `packs` in parallel on the current rayon pool.
///
/// Each pack fills its own accumulator; they are merged in pack order so
/// the report does not depend on scheduling. With `fail_fast`, the first
/// pack that is rejected or cannot be read stops the rest; which packs
/// were already running at that point depends on the pool.
pub fn scan_packs(git_dir: &Path, packs: &[PackPair], options: &ScanOptions) -> RepoReport {
    let stop = AtomicBool::new(false);
    let base = ScanResult::new(options.max_details, options.memlimit);
    let analyzer = Analyzer::new(options.strategy, options.thresholds).with_interrupt(&stop);

    let outcomes: Vec<(ScanResult, Result<(), AnalysisError>)> = packs
        .par_iter()
        .map(|pair| {
            let mut local = base.fork();
            if stop.load(Ordering::Relaxed) {
                return (local, Err(AnalysisError::Interrupted));
            }
            let outcome = analyzer.analyze(&pair.pack, &pair.idx, &mut local);
            let failed = outcome
                .as_ref()
                .is_err_and(|e| !matches!(e, AnalysisError::Interrupted));
            if options.fail_fast && failed {
                stop.store(true, Ordering::Relaxed);
            }
            (local, outcome)
        })
        .collect();

    let mut report = RepoReport {
        git_dir: git_dir.to_path_buf(),
        result: base,
        packs: packs.len(),
        rejected: Vec::new(),
        failed: Vec::new(),
        skipped: 0,
    };

    for (pair, (local, outcome)) in packs.iter().zip(outcomes) {
        report.result.merge(local);
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_threshold_exceeded() => {
                tracing::warn!(pack = %pair.pack.display(), "{e}");
                report.rejected.push(pair.pack.clone());
            }
            Err(AnalysisError::Interrupted) => report.skipped += 1,
            Err(e) => {
                tracing::warn!(pack = %pair.pack.display(), "cannot analyze pack: {e}");
                report.failed.push((pair.pack.clone(), e));
            }
        }
    }

    report
}

/// Write the human-readable report for one repository.
pub fn print_report(out: &mut impl Write, report: &RepoReport, thresholds: Thresholds) -> Result<()> {
    writeln!(out, "{}:", report.git_dir.display())?;
    for info in report.result.files() {
        writeln!(out, "  {}  {}", info.sha1_hex(), format_size(info.size))?;
    }

    let shown = report.result.files().len() as u64;
    let count = report.result.count();
    if count > shown {
        writeln!(out, "  ... and {} more", count - shown)?;
    }

    writeln!(
        out,
        "  {count} object(s) above {} in {} pack(s)",
        format_size(thresholds.warn),
        report.packs,
    )?;
    for pack in &report.rejected {
        writeln!(
            out,
            "  rejected: {} has objects above {}",
            display_name(pack),
            format_size(thresholds.limit),
        )?;
    }
    for (pack, e) in &report.failed {
        writeln!(out, "  error: {}: {e}", display_name(pack))?;
    }
    if report.skipped > 0 {
        writeln!(out, "  {} pack(s) not scanned after a failure", report.skipped)?;
    }
    Ok(())
}

fn display_name(pack: &Path) -> String {
    pack.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pack.display().to_string())
}
