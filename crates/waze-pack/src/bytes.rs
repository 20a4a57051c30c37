//! Big-endian integer primitives.
//!
//! Index and pack files store every integer in network byte order. All
//! decoding goes through these helpers: [`ByteCursor`] for bytes already
//! in memory, and the `read_*` functions for readers.

use std::io::{self, Read};

/// Chunk size used when streaming fixed-width tables out of a reader.
const CHUNK_SIZE: usize = 64 * 1024;

/// Sequential big-endian decoder over a byte slice.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.take::<4>()?;
        Some(u32::from_be_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Option<u64> {
        let bytes = self.take::<8>()?;
        Some(u64::from_be_bytes(bytes))
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        slice.try_into().ok()
    }
}

/// Read one big-endian u32. A short read is an `UnexpectedEof` error.
pub fn read_be_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Stream `count` big-endian u64 values into `out`.
///
/// The caller sizes `out` beforehand; only a fixed chunk buffer is
/// allocated here.
pub fn read_be_u64_table<R: Read>(reader: &mut R, count: usize, out: &mut Vec<u64>) -> io::Result<()> {
    visit_table(reader, count, 8, |c| c.read_u64(), |v| {
        out.push(v);
        Ok::<_, io::Error>(())
    })
}

/// Decode `count` big-endian u32 values and hand each to `visit`, in order.
///
/// Stops at the first error returned by `visit`.
pub fn visit_be_u32<R, E, F>(reader: &mut R, count: usize, visit: F) -> Result<(), E>
where
    R: Read,
    E: From<io::Error>,
    F: FnMut(u32) -> Result<(), E>,
{
    visit_table(reader, count, 4, |c| c.read_u32(), visit)
}

fn visit_table<R, T, E, D, F>(reader: &mut R, count: usize, width: usize, decode: D, mut visit: F) -> Result<(), E>
where
    R: Read,
    E: From<io::Error>,
    D: Fn(&mut ByteCursor<'_>) -> Option<T>,
    F: FnMut(T) -> Result<(), E>,
{
    let per_chunk = CHUNK_SIZE / width;
    let mut buf = vec![0u8; per_chunk.min(count.max(1)) * width];
    let mut left = count;
    while left > 0 {
        let n = left.min(per_chunk);
        let chunk = &mut buf[..n * width];
        reader.read_exact(chunk)?;
        let mut cursor = ByteCursor::new(chunk);
        while let Some(value) = decode(&mut cursor) {
            visit(value)?;
        }
        left -= n;
    }
    Ok(())
}
