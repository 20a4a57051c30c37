//! Byte-size arguments and display.

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Parse a size such as `512`, `64k`, `50M` or `2g` (1024-based suffixes,
/// as in git config integers).
pub fn parse_size(value: &str) -> Result<u64, String> {
    let s = value.trim();
    if s.is_empty() {
        return Err("empty size".into());
    }

    let (num_str, multiplier) = match s.as_bytes()[s.len() - 1] {
        b'k' | b'K' => (&s[..s.len() - 1], KIB),
        b'm' | b'M' => (&s[..s.len() - 1], MIB),
        b'g' | b'G' => (&s[..s.len() - 1], GIB),
        _ => (s, 1),
    };

    let base: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid size '{value}'"))?;
    base.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflows: '{value}'"))
}

/// Render a byte count for people.
pub fn format_size(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
