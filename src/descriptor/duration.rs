//! Duration attributes (`walltime`, `taskRetryDelay`).

/// Formats milliseconds as `HH:mm:ss`, dropping leading zero groups.
///
/// Every leading `00:` group is removed; when at least one was, the
/// remaining leading group also loses its padding zero. Sub-second
/// precision is truncated and negative values count as zero.
///
/// ```
/// use jobdesc::descriptor::duration::format_duration;
///
/// assert_eq!(format_duration(0), "0");
/// assert_eq!(format_duration(65_000), "1:05");
/// assert_eq!(format_duration(3_723_000), "01:02:03");
/// ```
pub fn format_duration(millis: i64) -> String {
    let total_seconds = millis.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let formatted = format!("{:02}:{:02}:{:02}", hours, minutes, seconds);

    let mut rest = formatted.as_str();
    let mut stripped = false;
    while let Some(tail) = rest.strip_prefix("00:") {
        rest = tail;
        stripped = true;
    }

    if stripped && rest.len() > 1 {
        if let Some(tail) = rest.strip_prefix('0') {
            return tail.to_string();
        }
    }
    rest.to_string()
}
