//! Index-only sizing: the gap between consecutive pack offsets.
//!
//! Pack entries are stored back to back, so the distance from one entry's
//! start to the next higher entry's start is exactly its on-disk size
//! (header plus compressed body). The trailing checksum bounds the last one.

use crate::estimate::SizeStrategy;
use crate::{AnalysisError, ObjectEntry, HASH_LEN, PACK_HEADER_SIZE};

/// Sizes entries by offset subtraction, without reading the pack.
#[derive(Debug, Clone, Copy)]
pub struct OffsetGaps {
    pack_len: u64,
}

impl OffsetGaps {
    /// `pack_len` is the total byte length of the `.pack` file.
    pub fn new(pack_len: u64) -> Result<Self, AnalysisError> {
        if pack_len < (PACK_HEADER_SIZE + HASH_LEN) as u64 {
            return Err(AnalysisError::Format(format!(
                "pack of {pack_len} bytes is too small to hold a header and checksum"
            )));
        }
        Ok(Self { pack_len })
    }

    /// Exclusive upper bound of object data: the start of the checksum.
    pub fn data_end(&self) -> u64 {
        self.pack_len - HASH_LEN as u64
    }
}

impl SizeStrategy for OffsetGaps {
    /// Visits entries from the highest offset down.
    fn visit_sizes<F>(&mut self, mut entries: Vec<ObjectEntry>, mut visit: F) -> Result<(), AnalysisError>
    where
        F: FnMut(ObjectEntry, u64) -> Result<(), AnalysisError>,
    {
        entries.sort_unstable_by(|a, b| b.offset.cmp(&a.offset));

        let mut boundary = self.data_end();
        for entry in entries {
            if entry.offset < PACK_HEADER_SIZE as u64 || entry.offset >= boundary {
                return Err(AnalysisError::Format(format!(
                    "object {} at offset {} lies outside pack data ending at {}",
                    entry.index, entry.offset, boundary
                )));
            }
            let size = boundary - entry.offset;
            boundary = entry.offset;
            visit(entry, size)?;
        }
        Ok(())
    }
}
