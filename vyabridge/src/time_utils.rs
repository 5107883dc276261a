//! Time formatting and conversion helpers.
//!
//! - HH:MM:SS display strings
//! - milliseconds / seconds conversion at the backend boundary
//! - CSS percentage widths for progress fills

/// Placeholder shown when a time value is missing or invalid.
pub const DISPLAY_TIME_FALLBACK: &str = "--:--:--";

/// Formats a duration in seconds as HH:MM:SS.
///
/// # Examples
/// ```
/// # use vyabridge::time_utils::format_hhmmss;
/// assert_eq!(format_hhmmss(0), "00:00:00");
/// assert_eq!(format_hhmmss(3661), "01:01:01");
/// ```
pub fn format_hhmmss(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Formats milliseconds as HH:MM:SS, truncating to whole seconds.
///
/// `None`, NaN, infinities and negative values yield
/// [`DISPLAY_TIME_FALLBACK`] instead of failing.
///
/// # Examples
/// ```
/// # use vyabridge::time_utils::format_display_time;
/// assert_eq!(format_display_time(3_725_000.0), "01:02:05");
/// assert_eq!(format_display_time(None), "--:--:--");
/// assert_eq!(format_display_time(f64::NAN), "--:--:--");
/// ```
pub fn format_display_time(ms: impl Into<Option<f64>>) -> String {
    match ms.into() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => format_hhmmss((ms / 1000.0).floor() as u64),
        _ => DISPLAY_TIME_FALLBACK.to_string(),
    }
}

/// Converts milliseconds to (fractional) seconds, without rounding.
#[inline]
pub fn ms_to_seconds(milliseconds: f64) -> f64 {
    milliseconds / 1000.0
}

/// Converts (fractional) seconds to milliseconds.
#[inline]
pub fn seconds_to_ms(seconds: f64) -> f64 {
    seconds * 1000.0
}

/// CSS width for a fill covering `fraction` of its track, clamped to `[0, 1]`.
pub fn percent_width(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    format!("{}%", fraction * 100.0)
}
