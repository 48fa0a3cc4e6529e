/// Format a non-negative number of seconds as `m:ss`.
///
/// Fractional seconds are truncated. Callers guard against missing or
/// negative values before calling.
pub fn format_time(seconds: f64) -> String {
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// `current / total` as shown under the track text.
pub fn format_position(current: f64, duration: f64) -> String {
    format!("{} / {}", format_time(current), format_time(duration))
}
