//! Synthetic pack + index writer for integration tests.
//!
//! Packs are real: zlib-compressed bodies, entry headers as git writes
//! them, SHA-1 trailers, and v2 indexes sorted by object name.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use waze_pack::{ObjectId, IDX_SIGNATURE, IDX_VERSION, PACK_SIGNATURE};

/// Object type numbers used in entry headers.
pub const COMMIT: u8 = 1;
pub const BLOB: u8 = 3;

/// One object as written into a fixture pack.
#[derive(Debug, Clone)]
pub struct Written {
    pub oid: ObjectId,
    pub kind: u8,
    pub offset: u64,
    /// Uncompressed content length, as declared in the entry header.
    pub size: u64,
    /// Header plus compressed body, the gap to the next entry.
    pub disk_size: u64,
}

/// A fixture pack on disk.
pub struct Fixture {
    pub pack_path: PathBuf,
    pub idx_path: PathBuf,
    pub objects: Vec<Written>,
}

impl Fixture {
    pub fn by_oid(&self, oid: &ObjectId) -> &Written {
        self.objects
            .iter()
            .find(|w| &w.oid == oid)
            .expect("object is in fixture")
    }
}

/// How offsets are stored in the generated index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetForm {
    /// 32-bit fields only (what git writes for packs under 2 GiB).
    Small,
    /// Every offset routed through the 64-bit table.
    Large,
}

pub struct PackBuilder {
    data: Vec<u8>,
    objects: Vec<Written>,
    crcs: Vec<u32>,
}

impl PackBuilder {
    pub fn new() -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(PACK_SIGNATURE);
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes()); // patched in finish
        Self {
            data,
            objects: Vec::new(),
            crcs: Vec::new(),
        }
    }

    pub fn add_blob(&mut self, content: &[u8]) -> Written {
        self.add_object(BLOB, content)
    }

    pub fn add_object(&mut self, kind: u8, content: &[u8]) -> Written {
        let offset = self.data.len() as u64;
        let header = encode_entry_header(kind, content.len() as u64);

        let mut compressed = Vec::new();
        {
            let mut encoder = ZlibEncoder::new(&mut compressed, Compression::default());
            encoder.write_all(content).unwrap();
            encoder.finish().unwrap();
        }

        let mut crc = crc32fast::Hasher::new();
        crc.update(&header);
        crc.update(&compressed);

        self.data.extend_from_slice(&header);
        self.data.extend_from_slice(&compressed);

        let written = Written {
            oid: object_id(kind, content),
            kind,
            offset,
            size: content.len() as u64,
            disk_size: (header.len() + compressed.len()) as u64,
        };
        self.objects.push(written.clone());
        self.crcs.push(crc.finalize());
        written
    }

    /// Write `<dir>/<name>.pack` and `<dir>/<name>.idx`.
    pub fn finish(mut self, dir: &Path, name: &str, form: OffsetForm) -> Fixture {
        let count = self.objects.len() as u32;
        self.data[8..12].copy_from_slice(&count.to_be_bytes());
        let checksum = sha1_digest(&self.data);
        self.data.extend_from_slice(&checksum);

        let pack_path = dir.join(format!("{name}.pack"));
        let idx_path = dir.join(format!("{name}.idx"));
        std::fs::write(&pack_path, &self.data).unwrap();

        let entries: Vec<(ObjectId, u64, u32)> = self
            .objects
            .iter()
            .zip(&self.crcs)
            .map(|(w, &crc)| (w.oid, w.offset, crc))
            .collect();
        std::fs::write(&idx_path, build_index(entries, &checksum, form)).unwrap();

        Fixture {
            pack_path,
            idx_path,
            objects: self.objects,
        }
    }
}

/// Build a v2 index from `(oid, offset, crc)` entries.
pub fn build_index(mut entries: Vec<(ObjectId, u64, u32)>, pack_checksum: &[u8], form: OffsetForm) -> Vec<u8> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut buf = Vec::new();
    buf.extend_from_slice(&IDX_SIGNATURE);
    buf.extend_from_slice(&IDX_VERSION.to_be_bytes());

    let mut fanout = [0u32; 256];
    for (oid, _, _) in &entries {
        fanout[oid.as_bytes()[0] as usize] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    for count in fanout {
        buf.extend_from_slice(&count.to_be_bytes());
    }

    for (oid, _, _) in &entries {
        buf.extend_from_slice(oid.as_bytes());
    }
    for (_, _, crc) in &entries {
        buf.extend_from_slice(&crc.to_be_bytes());
    }

    let mut large_offsets: Vec<u64> = Vec::new();
    for (_, offset, _) in &entries {
        if form == OffsetForm::Large || *offset >= 0x8000_0000 {
            let idx = large_offsets.len() as u32;
            buf.extend_from_slice(&(0x8000_0000u32 | idx).to_be_bytes());
            large_offsets.push(*offset);
        } else {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
    }
    for offset in &large_offsets {
        buf.extend_from_slice(&offset.to_be_bytes());
    }

    buf.extend_from_slice(pack_checksum);
    let idx_checksum = sha1_digest(&buf);
    buf.extend_from_slice(&idx_checksum);
    buf
}

/// Encode an entry header the way git writes it.
pub fn encode_entry_header(kind: u8, size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    let mut s = size;
    let mut c = (kind << 4) | (s & 0x0f) as u8;
    s >>= 4;
    while s > 0 {
        buf.push(c | 0x80);
        c = (s & 0x7f) as u8;
        s >>= 7;
    }
    buf.push(c);
    buf
}

/// Git object name: SHA-1 of `"<type> <len>\0" + content`.
pub fn object_id(kind: u8, content: &[u8]) -> ObjectId {
    let type_name = match kind {
        1 => "commit",
        2 => "tree",
        3 => "blob",
        4 => "tag",
        _ => panic!("no loose name for type {kind}"),
    };
    let mut hasher = Sha1::new();
    hasher.update(format!("{type_name} {}\0", content.len()).as_bytes());
    hasher.update(content);
    ObjectId::from_bytes(&hasher.finalize()).unwrap()
}

fn sha1_digest(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Sha1::digest(data));
    out
}

/// Deterministic, poorly compressible bytes.
pub fn noise(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}
