use std::fmt;
use std::str::FromStr;

use crate::{AnalysisError, HASH_LEN};

const HEX_ENCODE: &[u8; 16] = b"0123456789abcdef";

/// SHA-1 name of an object, as stored in the index name table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; HASH_LEN]);

impl ObjectId {
    /// Create an ObjectId from exactly 20 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AnalysisError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            AnalysisError::Format(format!(
                "object name must be {HASH_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Parse a 40-character hex string (either case).
    pub fn from_hex(hex: &str) -> Result<Self, AnalysisError> {
        let hex = hex.as_bytes();
        if hex.len() != HASH_LEN * 2 {
            return Err(AnalysisError::Format(format!(
                "object name must be {} hex digits, got {}",
                HASH_LEN * 2,
                hex.len()
            )));
        }
        let mut bytes = [0u8; HASH_LEN];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            let hi = nibble(pair[0]).ok_or_else(|| bad_hex(pair[0], i * 2))?;
            let lo = nibble(pair[1]).ok_or_else(|| bad_hex(pair[1], i * 2 + 1))?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering (40 characters).
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(HASH_LEN * 2);
        for &b in &self.0 {
            out.push(HEX_ENCODE[(b >> 4) as usize] as char);
            out.push(HEX_ENCODE[(b & 0x0f) as usize] as char);
        }
        out
    }
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn bad_hex(c: u8, position: usize) -> AnalysisError {
    AnalysisError::Format(format!(
        "invalid hex character at position {position}: '{}'",
        c as char
    ))
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
