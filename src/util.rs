//! Human-readable sizes for log fields.

const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Binary-prefixed size, one decimal above a kibibyte.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
