//! Bounded accumulation of flagged objects across packs.

use crate::{ObjectId, DEFAULT_MEMLIMIT, MAX_DETAILS};

/// A flagged object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub oid: ObjectId,
    pub size: u64,
}

impl FileInfo {
    /// The object name as 40 lowercase hex digits.
    pub fn sha1_hex(&self) -> String {
        self.oid.to_hex()
    }
}

/// Running totals for a scan over one or more packs.
///
/// `files` holds at most `limits` entries; `count` keeps counting past
/// that. Nothing is ever removed or reordered. A pack whose analysis fails
/// part-way may already have added to both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    files: Vec<FileInfo>,
    count: u64,
    limits: usize,
    memlimit: u64,
}

impl Default for ScanResult {
    fn default() -> Self {
        Self::new(MAX_DETAILS, DEFAULT_MEMLIMIT)
    }
}

impl ScanResult {
    /// `limits` caps the materialized entries; `memlimit` caps transient
    /// buffers during each pack analysis.
    pub fn new(limits: usize, memlimit: u64) -> Self {
        Self {
            files: Vec::new(),
            count: 0,
            limits,
            memlimit,
        }
    }

    /// An empty accumulator with the same bounds, for a parallel worker.
    pub fn fork(&self) -> Self {
        Self::new(self.limits, self.memlimit)
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    /// Total flagged objects, including those not kept in `files`.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn limits(&self) -> usize {
        self.limits
    }

    pub fn memlimit(&self) -> u64 {
        self.memlimit
    }

    /// Whether another [`FileInfo`] would still be kept.
    pub fn has_capacity(&self) -> bool {
        self.files.len() < self.limits
    }

    /// Count a flagged object, keeping its details if there is room.
    ///
    /// Returns whether the details were kept.
    pub fn record(&mut self, oid: ObjectId, size: u64) -> bool {
        self.count += 1;
        if !self.has_capacity() {
            return false;
        }
        self.files.push(FileInfo { oid, size });
        true
    }

    /// Count a flagged object without details.
    pub fn tally(&mut self) {
        self.count += 1;
    }

    /// Fold another accumulator into this one: files are appended up to
    /// `limits`, counts are summed.
    pub fn merge(&mut self, other: ScanResult) {
        self.count += other.count;
        let room = self.limits.saturating_sub(self.files.len());
        self.files.extend(other.files.into_iter().take(room));
    }
}
