//! Platform backend implementations
//!
//! One module per external source, each implementing
//! [`encore_core::traits::MediaSource`]. Shared parsing helpers live here.

mod catalog;
mod saavn;
mod youtube;

pub use catalog::CatalogSource;
pub use saavn::SaavnSource;
pub use youtube::YouTubeSource;

use serde_json::Value;
use tracing::warn;

/// Convert a clock string (`H:MM:SS`, `MM:SS`, or bare seconds) to whole
/// seconds. Malformed or empty input normalizes to 0.
pub(crate) fn parse_clock_duration(text: &str) -> u32 {
    let parts: Vec<&str> = text.split(':').collect();
    let nums: Option<Vec<u32>> = parts.iter().map(|p| p.trim().parse().ok()).collect();
    match nums.as_deref() {
        Some([h, m, s]) => h * 3600 + m * 60 + s,
        Some([m, s]) => m * 60 + s,
        Some([s]) => *s,
        _ => 0,
    }
}

/// Pull a duration in seconds out of a loosely-typed JSON field.
///
/// Sources report durations as numbers (possibly fractional) or as clock
/// strings; anything else normalizes to 0.
pub(crate) fn duration_from_value(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_f64().map_or(0, |f| f.max(0.0) as u32),
        Value::String(s) => parse_clock_duration(s),
        _ => 0,
    }
}

/// Borrow a string field from a JSON object, empty when absent.
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Make a track id safe to use as a file name.
pub(crate) fn sanitize_track_id(id: &str) -> String {
    id.chars()
        .map(|c| if matches!(c, '/' | '\\' | ' ') { '_' } else { c })
        .collect()
}

/// Run `yt-dlp` with the given args and parse its stdout as JSON.
///
/// Failures (binary missing, non-zero exit, unparseable output) are logged
/// and collapse to `None`, matching the backend boundary rule.
pub(crate) async fn run_ytdlp_json(args: &[&str]) -> Option<Value> {
    let output = match tokio::process::Command::new("yt-dlp")
        .args(args)
        .output()
        .await
    {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "failed to spawn yt-dlp");
            return None;
        }
    };

    if !output.status.success() {
        warn!(
            status = ?output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "yt-dlp exited with an error"
        );
        return None;
    }

    match serde_json::from_slice(&output.stdout) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "yt-dlp produced unparseable JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clock_duration_mm_ss() {
        assert_eq!(parse_clock_duration("3:15"), 195);
    }

    #[test]
    fn clock_duration_h_mm_ss() {
        assert_eq!(parse_clock_duration("1:02:03"), 3723);
    }

    #[test]
    fn clock_duration_bare_seconds() {
        assert_eq!(parse_clock_duration("262"), 262);
    }

    #[test]
    fn clock_duration_malformed_is_zero() {
        assert_eq!(parse_clock_duration(""), 0);
        assert_eq!(parse_clock_duration("abc"), 0);
        assert_eq!(parse_clock_duration("1:2:3:4"), 0);
        assert_eq!(parse_clock_duration("3:xx"), 0);
    }

    #[test]
    fn duration_from_number_or_string() {
        assert_eq!(duration_from_value(&json!(212)), 212);
        assert_eq!(duration_from_value(&json!(212.7)), 212);
        assert_eq!(duration_from_value(&json!("3:32")), 212);
        assert_eq!(duration_from_value(&json!(null)), 0);
        assert_eq!(duration_from_value(&json!(-5)), 0);
    }

    #[test]
    fn sanitized_ids_have_no_separators() {
        assert_eq!(sanitize_track_id("Tum Hi Ho/OgwVXyFo"), "Tum_Hi_Ho_OgwVXyFo");
    }
}
