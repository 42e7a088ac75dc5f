//! Duration strings used throughout flowkeeper.toml.

use std::time::Duration;

/// Unit suffixes, longest first so `ms` is not read as `m`.
const UNITS: [(&str, u64); 3] = [("ms", 1), ("s", 1_000), ("m", 60_000)];

/// Parse `500ms`, `5s`, `2m`, or a bare number of seconds.
///
/// Returns `None` for anything else, including values whose millisecond
/// count does not fit in a `u64`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, millis_per_unit) = UNITS
        .iter()
        .find_map(|(suffix, factor)| s.strip_suffix(suffix).map(|d| (d.trim(), *factor)))
        .unwrap_or((s, 1_000));

    let value: u64 = digits.parse().ok()?;
    value.checked_mul(millis_per_unit).map(Duration::from_millis)
}
