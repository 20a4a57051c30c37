//! Per-pack analysis: index → sizes → classification → [`ScanResult`].

use std::io::{Read, Seek};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::classify::{Decision, Thresholds};
use crate::estimate::{OffsetGaps, PackHeaders, SizeStrategy};
use crate::index::IndexFile;
use crate::{AnalysisError, ScanResult};

/// Which size estimate to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// On-disk sizes from offset gaps; reads only the index and the pack length.
    #[default]
    IndexOnly,
    /// Declared sizes from each entry header in the pack.
    PackAware,
}

/// Analyze a pack using on-disk (compressed) sizes derived from the index.
pub fn analyze_index_only(
    pack_path: impl AsRef<Path>,
    idx_path: impl AsRef<Path>,
    warn: u64,
    limit: u64,
    result: &mut ScanResult,
) -> Result<(), AnalysisError> {
    Analyzer::new(Strategy::IndexOnly, Thresholds::new(warn, limit)).analyze(pack_path, idx_path, result)
}

/// Analyze a pack using the sizes declared in its entry headers.
pub fn analyze_pack_aware(
    pack_path: impl AsRef<Path>,
    idx_path: impl AsRef<Path>,
    warn: u64,
    limit: u64,
    result: &mut ScanResult,
) -> Result<(), AnalysisError> {
    Analyzer::new(Strategy::PackAware, Thresholds::new(warn, limit)).analyze(pack_path, idx_path, result)
}

/// Configured analysis of one pack at a time.
///
/// Every object is visited even after one exceeds `limit`; all flagged
/// objects (rejected ones included) reach the result, and the pack then
/// fails with [`AnalysisError::ThresholdExceeded`].
#[derive(Debug, Clone, Copy)]
pub struct Analyzer<'a> {
    strategy: Strategy,
    thresholds: Thresholds,
    interrupt: Option<&'a AtomicBool>,
}

/// Per-pack tallies, used for the final verdict and logging.
#[derive(Debug, Default)]
struct PackTally {
    objects: u64,
    flagged: u64,
    rejected: u64,
    largest: u64,
}

impl<'a> Analyzer<'a> {
    pub fn new(strategy: Strategy, thresholds: Thresholds) -> Self {
        Self {
            strategy,
            thresholds,
            interrupt: None,
        }
    }

    /// Stop with [`AnalysisError::Interrupted`] once `flag` is set.
    /// The flag is checked before each object.
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Analyze the pack at `pack_path` with its index at `idx_path`.
    ///
    /// Both files are opened read-only and closed before returning.
    pub fn analyze(
        &self,
        pack_path: impl AsRef<Path>,
        idx_path: impl AsRef<Path>,
        result: &mut ScanResult,
    ) -> Result<(), AnalysisError> {
        let pack_path = pack_path.as_ref();
        let index = IndexFile::open(idx_path.as_ref(), result.memlimit())?;
        tracing::debug!(pack = %pack_path.display(), strategy = ?self.strategy, "analyzing pack");

        match self.strategy {
            Strategy::IndexOnly => {
                let pack_len = std::fs::metadata(pack_path)?.len();
                self.run(index, OffsetGaps::new(pack_len)?, result)
            }
            Strategy::PackAware => {
                let pack = PackHeaders::open(pack_path)?;
                self.run_pack_aware(index, pack, result)
            }
        }
    }

    /// Analyze from already-open readers.
    ///
    /// `index_len` and `pack_len` are the total lengths of the data behind
    /// each reader. The index-only strategy never reads `pack`.
    pub fn analyze_readers<I, P>(
        &self,
        index: I,
        index_len: u64,
        pack: P,
        pack_len: u64,
        result: &mut ScanResult,
    ) -> Result<(), AnalysisError>
    where
        I: Read + Seek,
        P: Read + Seek,
    {
        let index = IndexFile::from_reader(index, index_len, result.memlimit())?;
        match self.strategy {
            Strategy::IndexOnly => self.run(index, OffsetGaps::new(pack_len)?, result),
            Strategy::PackAware => self.run_pack_aware(index, PackHeaders::new(pack), result),
        }
    }

    fn run_pack_aware<I, P>(
        &self,
        index: IndexFile<I>,
        mut pack: PackHeaders<P>,
        result: &mut ScanResult,
    ) -> Result<(), AnalysisError>
    where
        I: Read + Seek,
        P: Read + Seek,
    {
        pack.verify_header(index.num_objects())?;
        self.run(index, pack, result)
    }

    fn run<I, S>(&self, mut index: IndexFile<I>, mut sizes: S, result: &mut ScanResult) -> Result<(), AnalysisError>
    where
        I: Read + Seek,
        S: SizeStrategy,
    {
        let entries = index.read_entries()?;
        let mut tally = PackTally::default();

        sizes.visit_sizes(entries, |entry, size| {
            if self.interrupt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(AnalysisError::Interrupted);
            }
            tally.objects += 1;

            let decision = self.thresholds.classify(size);
            if decision == Decision::Skip {
                return Ok(());
            }
            if decision == Decision::Reject {
                tally.rejected += 1;
            }
            tally.flagged += 1;
            tally.largest = tally.largest.max(size);

            if result.has_capacity() {
                let oid = index.oid_at(entry.index)?;
                tracing::trace!(%oid, size, ?decision, "flagged object");
                result.record(oid, size);
            } else {
                result.tally();
            }
            Ok(())
        })?;

        tracing::debug!(
            objects = tally.objects,
            flagged = tally.flagged,
            rejected = tally.rejected,
            largest = tally.largest,
            "pack analyzed"
        );

        if tally.rejected > 0 {
            return Err(AnalysisError::ThresholdExceeded {
                rejected: tally.rejected,
                largest: tally.largest,
                limit: self.thresholds.limit,
            });
        }
        Ok(())
    }
}
