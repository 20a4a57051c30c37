//! Oversized-object detection for git packfiles.
//!
//! This crate reads a pack index (v2) and derives the size of every object
//! in the matching pack without inflating any object data. Sizes come from
//! one of two strategies:
//!
//! - **index-only**: sort all offsets and take the gap to the next object,
//!   which is the on-disk (compressed) size;
//! - **pack-aware**: decode each object's variable-length entry header,
//!   which declares the uncompressed size.
//!
//! Every size is classified against caller-supplied `warn`/`limit`
//! thresholds and flagged objects are accumulated into a bounded
//! [`ScanResult`] that can span many packs.

pub mod analyze;
mod bytes;
pub mod classify;
pub mod estimate;
pub mod index;
pub mod oid;
pub mod scan;

pub use analyze::{analyze_index_only, analyze_pack_aware, Analyzer, Strategy};
pub use classify::{classify, Decision, Thresholds};
pub use estimate::{OffsetGaps, PackHeaders, SizeStrategy};
pub use index::{IndexFile, IndexLayout, ObjectEntry};
pub use oid::ObjectId;
pub use scan::{FileInfo, ScanResult};

/// Errors that can occur while analyzing a pack.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid pack data: {0}")]
    Format(String),

    #[error("buffer of {needed} bytes exceeds memory limit of {limit} bytes")]
    ResourceLimit { needed: u64, limit: u64 },

    #[error("{rejected} object(s) exceed the size limit of {limit} bytes (largest {largest} bytes)")]
    ThresholdExceeded {
        rejected: u64,
        largest: u64,
        limit: u64,
    },

    #[error("analysis interrupted")]
    Interrupted,
}

impl AnalysisError {
    /// True for the expected "pack holds an object above `limit`" outcome,
    /// as opposed to I/O or format defects.
    pub fn is_threshold_exceeded(&self) -> bool {
        matches!(self, Self::ThresholdExceeded { .. })
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION: u32 = 2;

/// Length of a SHA-1 digest, the name width and trailer width of v2 files.
pub const HASH_LEN: usize = 20;

/// Default cap on materialized [`FileInfo`] entries.
pub const MAX_DETAILS: usize = 7;

/// Default ceiling on transient per-pack buffers.
pub const DEFAULT_MEMLIMIT: u64 = 256 << 20;
