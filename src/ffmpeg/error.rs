//! Turn FFmpeg exit codes and stderr into one-line summaries for step logs.
//!
//! Exit codes are from ffmpeg.c: 1 (general), 69 (rate exceeded),
//! 123 (hard exit), 255 (signal). -1 is used for spawn failure.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FfmpegErrorPayload {
    pub summary: String,
    pub detail: String,
}

const ELLIPSIS: &str = "…";
const MAX_SUMMARY_LEN: usize = 120;

/// Builds a short summary from the exit code, falling back to the most telling stderr line.
pub fn parse_ffmpeg_error(stderr: &str, exit_code: Option<i32>) -> FfmpegErrorPayload {
    let summary = match exit_code.and_then(known_exit_code_summary) {
        Some(msg) => match telling_line(stderr) {
            Some(line) if exit_code == Some(1) => {
                truncate(&format!("{} {}", msg, line), MAX_SUMMARY_LEN)
            }
            _ => msg.to_string(),
        },
        None => match (exit_code, telling_line(stderr)) {
            (_, Some(line)) => truncate(line, MAX_SUMMARY_LEN),
            (Some(code), None) => format!("FFmpeg failed (exit code {}).", code),
            (None, None) => truncate(first_non_empty(stderr), MAX_SUMMARY_LEN),
        },
    };
    FfmpegErrorPayload {
        summary,
        detail: stderr.trim().to_string(),
    }
}

fn known_exit_code_summary(code: i32) -> Option<&'static str> {
    match code {
        -1 => Some("FFmpeg not found or failed to start."),
        1 => Some("FFmpeg failed."),
        69 => Some("Encoding rate limit exceeded."),
        123 | 255 => Some("Encoding was stopped."),
        _ => None,
    }
}

/// Last stderr line that names an actual problem (filter, codec or input errors).
fn telling_line(stderr: &str) -> Option<&str> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| {
            let lower = l.to_ascii_lowercase();
            lower.contains("error")
                || lower.contains("no such")
                || lower.contains("invalid")
                || lower.contains("unknown encoder")
        })
}

fn first_non_empty(stderr: &str) -> &str {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len.saturating_sub(ELLIPSIS.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &s[..cut], ELLIPSIS)
}
