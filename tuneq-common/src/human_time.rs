//! Human-readable time formatting for the status display

/// Format whole seconds as `XmYs` (minutes are not wrapped into hours).
///
/// # Examples
///
/// ```
/// use tuneq_common::human_time::format_min_sec;
///
/// assert_eq!(format_min_sec(0), "0m0s");
/// assert_eq!(format_min_sec(187), "3m7s");
/// assert_eq!(format_min_sec(3725), "62m5s");
/// ```
pub fn format_min_sec(seconds: u64) -> String {
    format!("{}m{}s", seconds / 60, seconds % 60)
}

/// Convert a frame count to whole seconds at `sample_rate`.
///
/// Returns 0 for a zero sample rate.
pub fn frames_to_secs(frames: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    frames as u64 / sample_rate as u64
}

/// Format a frame position as `Position: XmYs / XmYs`.
pub fn format_position(position: usize, total: usize, sample_rate: u32) -> String {
    format!(
        "Position: {} / {}",
        format_min_sec(frames_to_secs(position, sample_rate)),
        format_min_sec(frames_to_secs(total, sample_rate))
    )
}
