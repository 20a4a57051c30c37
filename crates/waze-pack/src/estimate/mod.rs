//! Object size strategies.
//!
//! Both strategies take the resolved entries from the index and report a
//! size for each:
//!
//! - [`OffsetGaps`] needs only the pack length and yields on-disk sizes;
//! - [`PackHeaders`] reads each entry header from the pack and yields the
//!   declared uncompressed sizes.

pub mod header;
pub mod offsets;

pub use header::{decode_header, decode_size, EntryHeader, PackHeaders};
pub use offsets::OffsetGaps;

use crate::{AnalysisError, ObjectEntry};

/// A way of turning index entries into object sizes.
pub trait SizeStrategy {
    /// Compute the size of every entry and hand `(entry, size)` to `visit`.
    ///
    /// Visiting order is strategy-defined. The first error, from either the
    /// strategy or `visit`, ends the walk.
    fn visit_sizes<F>(&mut self, entries: Vec<ObjectEntry>, visit: F) -> Result<(), AnalysisError>
    where
        F: FnMut(ObjectEntry, u64) -> Result<(), AnalysisError>;
}
