//! Duration probing from FFmpeg's diagnostic banner.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::runner::MediaRunner;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d+):(\d+\.\d+)").expect("invalid duration regex")
});

/// Parse `Duration: HH:MM:SS.ff` from FFmpeg output. None when absent (e.g. `Duration: N/A`).
pub fn parse_duration(text: &str) -> Option<f64> {
    let caps = DURATION_RE.captures(text)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Probe `path`; None when the probe process fails or prints no usable duration.
pub fn probe_duration(runner: &dyn MediaRunner, path: &Path) -> Option<f64> {
    match runner.inspect(path) {
        Ok(text) => parse_duration(&text).filter(|d| *d > 0.0),
        Err(e) => {
            log::debug!(
                target: "ytp::ffmpeg::probe",
                "probe failed for {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Probe with a fallback used by effects that only need an approximate length.
pub fn duration_or(runner: &dyn MediaRunner, path: &Path, fallback: f64) -> f64 {
    probe_duration(runner, path).unwrap_or_else(|| {
        log::debug!(
            target: "ytp::ffmpeg::probe",
            "no duration for {}, assuming {}s",
            path.display(),
            fallback
        );
        fallback
    })
}
