//! Pack-aware sizing: decode each entry's own header.
//!
//! Every pack entry starts with a variable-length header:
//!
//! ```text
//! first byte:  C TTT SSSS   (C = continuation, T = type, S = size bits 0..4)
//! next bytes:  C SSSSSSS    (7 more size bits each, little-endian groups)
//! ```
//!
//! The size is the object's uncompressed length. For deltas it is the
//! length of the delta data, which is what the pack stores for them.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::estimate::SizeStrategy;
use crate::{AnalysisError, ObjectEntry, PACK_HEADER_SIZE, PACK_SIGNATURE};

const CONTINUE: u8 = 0x80;
const TYPE_MASK: u8 = 0x70;
const FIRST_SIZE_MASK: u8 = 0x0f;
const SIZE_MASK: u8 = 0x7f;
const FIRST_SIZE_BITS: u32 = 4;
const SIZE_BITS: u32 = 7;

/// Entry headers are a handful of bytes; one small read covers them.
const READ_AHEAD: usize = 32;

/// A decoded pack entry header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Type number (1 commit, 2 tree, 3 blob, 4 tag, 6 ofs-delta, 7 ref-delta).
    pub kind: u8,
    /// Declared uncompressed size.
    pub size: u64,
    /// Number of header bytes consumed.
    pub len: usize,
}

/// Decode an entry header from `reader`, consuming only its bytes.
///
/// Running out of input is an I/O error; a size too wide for 64 bits is a
/// format error.
pub fn decode_header<R: Read>(reader: &mut R) -> Result<EntryHeader, AnalysisError> {
    let mut b = read_byte(reader)?;
    let kind = (b & TYPE_MASK) >> FIRST_SIZE_BITS;
    let mut size = (b & FIRST_SIZE_MASK) as u64;
    let mut shift = FIRST_SIZE_BITS;
    let mut len = 1;

    while b & CONTINUE != 0 {
        b = read_byte(reader)?;
        len += 1;
        let bits = (b & SIZE_MASK) as u64;
        if bits != 0 {
            if shift >= u64::BITS || (bits << shift) >> shift != bits {
                return Err(AnalysisError::Format(format!(
                    "entry header size does not fit in 64 bits after {len} bytes"
                )));
            }
            size += bits << shift;
        }
        shift += SIZE_BITS;
    }

    Ok(EntryHeader { kind, size, len })
}

/// Decode the declared size from the bytes of an entry header.
pub fn decode_size(mut data: &[u8]) -> Result<u64, AnalysisError> {
    Ok(decode_header(&mut data)?.size)
}

fn read_byte<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Sizes entries from their pack headers, one seek per object.
pub struct PackHeaders<R> {
    reader: R,
}

impl PackHeaders<BufReader<File>> {
    /// Open a pack file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::with_capacity(READ_AHEAD, file)))
    }
}

impl<R: Read + Seek> PackHeaders<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Check the pack signature and version, and that the pack holds as
    /// many objects as its index claims.
    pub fn verify_header(&mut self, expected_objects: u32) -> Result<(), AnalysisError> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; PACK_HEADER_SIZE];
        self.reader.read_exact(&mut header)?;
        if &header[0..4] != PACK_SIGNATURE {
            return Err(AnalysisError::Format("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if version != 2 && version != 3 {
            return Err(AnalysisError::Format(format!(
                "unsupported pack version {version}"
            )));
        }
        let num_objects = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        if num_objects != expected_objects {
            return Err(AnalysisError::Format(format!(
                "pack has {num_objects} objects but index has {expected_objects}"
            )));
        }
        Ok(())
    }

    /// Declared size of the object whose entry starts at `offset`.
    pub fn object_size(&mut self, offset: u64) -> Result<u64, AnalysisError> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(decode_header(&mut self.reader)?.size)
    }
}

impl<R: Read + Seek> SizeStrategy for PackHeaders<R> {
    /// Visits entries in index order.
    fn visit_sizes<F>(&mut self, entries: Vec<ObjectEntry>, mut visit: F) -> Result<(), AnalysisError>
    where
        F: FnMut(ObjectEntry, u64) -> Result<(), AnalysisError>,
    {
        for entry in entries {
            let size = self.object_size(entry.offset)?;
            visit(entry, size)?;
        }
        Ok(())
    }
}
