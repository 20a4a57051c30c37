//! Threshold classification.

/// Caller-chosen size bounds, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Objects strictly larger than this are recorded.
    pub warn: u64,
    /// Objects strictly larger than this reject the whole pack.
    pub limit: u64,
}

impl Thresholds {
    pub fn new(warn: u64, limit: u64) -> Self {
        Self { warn, limit }
    }

    pub fn classify(&self, size: u64) -> Decision {
        classify(size, self.warn, self.limit)
    }
}

/// What to do with an object of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// At or below `warn`.
    Skip,
    /// Above `warn`, at or below `limit`.
    Record,
    /// Above `limit`.
    Reject,
}

/// Classify `size` against `warn` and `limit`.
///
/// `limit` is checked first, so with `warn > limit` nothing between the
/// two is ever recorded.
pub fn classify(size: u64, warn: u64, limit: u64) -> Decision {
    if size > limit {
        Decision::Reject
    } else if size > warn {
        Decision::Record
    } else {
        Decision::Skip
    }
}
