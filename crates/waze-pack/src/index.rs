//! Pack index (v2) decoding.
//!
//! Only the parts needed for size analysis are read: the header, the last
//! fan-out entry (the object count), the offset tables, and individual
//! name-table slots for reporting. Format:
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 × 4-byte big-endian cumulative counts
//! OIDs:    N × 20-byte sorted OIDs
//! CRC32:   N × 4-byte CRC32 values
//! Offsets: N × 4-byte offsets (high bit = 1 → use 64-bit table)
//! 64-bit:  M × 8-byte offsets (for packs > 2GB)
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! `M` is not stored anywhere; it is derived from the file size.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::bytes::{read_be_u32, read_be_u64_table, visit_be_u32};
use crate::{AnalysisError, ObjectId, HASH_LEN, IDX_SIGNATURE, IDX_VERSION};

const HEADER_SIZE: u64 = 8;
const FANOUT_SIZE: u64 = 256 * 4;
/// Name + CRC32 + 32-bit offset.
const PER_OBJECT_SIZE: u64 = HASH_LEN as u64 + 4 + 4;
const TRAILER_SIZE: u64 = 2 * HASH_LEN as u64;

const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;
const LARGE_OFFSET_MASK: u32 = 0x7fff_ffff;

/// An object's position in the pack, paired with its slot in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEntry {
    pub offset: u64,
    /// Ordinal in the index tables; locates the object's name.
    pub index: u32,
}

/// Byte geometry of a v2 index with a given object count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLayout {
    num_objects: u32,
    large_offsets: u32,
}

impl IndexLayout {
    /// Derive the layout from the object count and the total file size.
    ///
    /// The 64-bit table size is whatever remains once the fixed-width
    /// sections are accounted for; it must be a whole number of 8-byte
    /// entries and cannot outnumber the objects.
    pub fn from_file_size(num_objects: u32, file_size: u64) -> Result<Self, AnalysisError> {
        let fixed = HEADER_SIZE + FANOUT_SIZE + num_objects as u64 * PER_OBJECT_SIZE + TRAILER_SIZE;
        let rest = file_size.checked_sub(fixed).ok_or_else(|| {
            AnalysisError::Format(format!(
                "index too small for {num_objects} objects: {file_size} < {fixed} bytes"
            ))
        })?;
        if rest % 8 != 0 {
            return Err(AnalysisError::Format(format!(
                "index has {rest} trailing bytes, not a whole 64-bit offset table"
            )));
        }
        let large = rest / 8;
        if large > num_objects as u64 {
            return Err(AnalysisError::Format(format!(
                "index implies {large} large offsets for only {num_objects} objects"
            )));
        }
        Ok(Self {
            num_objects,
            large_offsets: large as u32,
        })
    }

    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Number of entries in the 64-bit offset table.
    pub fn large_offsets(&self) -> u32 {
        self.large_offsets
    }

    /// Position of the last fan-out entry, which holds the object count.
    pub const fn count_position() -> u64 {
        HEADER_SIZE + 255 * 4
    }

    pub fn name_table(&self) -> u64 {
        HEADER_SIZE + FANOUT_SIZE
    }

    pub fn crc_table(&self) -> u64 {
        self.name_table() + self.num_objects as u64 * HASH_LEN as u64
    }

    pub fn offset_table(&self) -> u64 {
        self.crc_table() + self.num_objects as u64 * 4
    }

    pub fn large_offset_table(&self) -> u64 {
        self.offset_table() + self.num_objects as u64 * 4
    }

    /// Position of the name for the object at `index`.
    pub fn name_position(&self, index: u32) -> u64 {
        self.name_table() + index as u64 * HASH_LEN as u64
    }

}

/// Resolve a raw 32-bit offset field against the 64-bit table.
///
/// With the high bit clear the field is the offset; with it set, the low
/// 31 bits index `large`.
pub fn resolve_offset(field: u32, large: &[u64]) -> Result<u64, AnalysisError> {
    if field & LARGE_OFFSET_FLAG == 0 {
        return Ok(field as u64);
    }
    let idx = (field & LARGE_OFFSET_MASK) as usize;
    large.get(idx).copied().ok_or_else(|| {
        AnalysisError::Format(format!(
            "large offset index {idx} out of range ({} entries)",
            large.len()
        ))
    })
}

/// Fail with `ResourceLimit` unless `needed` bytes fit within `limit`.
pub(crate) fn check_budget(needed: u64, limit: u64) -> Result<(), AnalysisError> {
    if needed > limit {
        return Err(AnalysisError::ResourceLimit { needed, limit });
    }
    Ok(())
}

/// An open pack index, read through seeks rather than a full load.
pub struct IndexFile<R> {
    reader: R,
    layout: IndexLayout,
    memlimit: u64,
}

impl IndexFile<BufReader<File>> {
    /// Open an index file read-only.
    pub fn open(path: impl AsRef<Path>, memlimit: u64) -> Result<Self, AnalysisError> {
        let file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();
        Self::from_reader(BufReader::new(file), file_size, memlimit)
    }
}

impl<R: Read + Seek> IndexFile<R> {
    /// Validate the header and derive the layout.
    ///
    /// `file_size` is the total length of the index data behind `reader`.
    pub fn from_reader(mut reader: R, file_size: u64, memlimit: u64) -> Result<Self, AnalysisError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut header)?;
        if header[0..4] != IDX_SIGNATURE {
            return Err(AnalysisError::Format("bad index signature".into()));
        }
        let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if version != IDX_VERSION {
            return Err(AnalysisError::Format(format!(
                "unsupported index version {version}, expected {IDX_VERSION}"
            )));
        }

        reader.seek(SeekFrom::Start(IndexLayout::count_position()))?;
        let num_objects = read_be_u32(&mut reader)?;
        let layout = IndexLayout::from_file_size(num_objects, file_size)?;

        tracing::debug!(
            objects = layout.num_objects(),
            large_offsets = layout.large_offsets(),
            "read pack index header"
        );

        Ok(Self {
            reader,
            layout,
            memlimit,
        })
    }

    pub fn num_objects(&self) -> u32 {
        self.layout.num_objects()
    }

    pub fn large_offset_count(&self) -> u32 {
        self.layout.large_offsets()
    }

    /// Read every raw 32-bit offset field, in index order.
    pub fn read_offset_fields(&mut self) -> Result<Vec<u32>, AnalysisError> {
        let n = self.layout.num_objects() as usize;
        check_budget(n as u64 * 4, self.memlimit)?;
        let mut fields = Vec::with_capacity(n);
        self.reader.seek(SeekFrom::Start(self.layout.offset_table()))?;
        visit_be_u32(&mut self.reader, n, |field| {
            fields.push(field);
            Ok::<_, AnalysisError>(())
        })?;
        Ok(fields)
    }

    /// Read the 64-bit offset table. Empty when the pack is small.
    pub fn read_large_offsets(&mut self) -> Result<Vec<u64>, AnalysisError> {
        let n = self.layout.large_offsets() as usize;
        if n == 0 {
            return Ok(Vec::new());
        }
        check_budget(n as u64 * 8, self.memlimit)?;
        let mut large = Vec::with_capacity(n);
        self.reader
            .seek(SeekFrom::Start(self.layout.large_offset_table()))?;
        read_be_u64_table(&mut self.reader, n, &mut large)?;
        Ok(large)
    }

    /// Read and resolve every object's pack offset, in index order.
    ///
    /// The entry list and the 64-bit table are budgeted together against
    /// the memory limit before either is allocated.
    pub fn read_entries(&mut self) -> Result<Vec<ObjectEntry>, AnalysisError> {
        let n = self.layout.num_objects() as usize;
        let needed = n as u64 * std::mem::size_of::<ObjectEntry>() as u64
            + self.layout.large_offsets() as u64 * 8;
        check_budget(needed, self.memlimit)?;

        let large = self.read_large_offsets()?;
        let mut entries = Vec::with_capacity(n);
        self.reader.seek(SeekFrom::Start(self.layout.offset_table()))?;
        let mut index = 0u32;
        visit_be_u32(&mut self.reader, n, |field| {
            let offset = resolve_offset(field, &large)?;
            entries.push(ObjectEntry { offset, index });
            index += 1;
            Ok::<_, AnalysisError>(())
        })?;
        Ok(entries)
    }

    /// Read the name of the object at `index`.
    pub fn oid_at(&mut self, index: u32) -> Result<ObjectId, AnalysisError> {
        if index >= self.layout.num_objects() {
            return Err(AnalysisError::Format(format!(
                "object index {index} out of range ({} objects)",
                self.layout.num_objects()
            )));
        }
        self.reader
            .seek(SeekFrom::Start(self.layout.name_position(index)))?;
        let mut name = [0u8; HASH_LEN];
        self.reader.read_exact(&mut name)?;
        ObjectId::from_bytes(&name)
    }
}
