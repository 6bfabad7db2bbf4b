//! Scripted stand-in for FFmpeg, for pipeline tests that must not spawn processes.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::AppError;
use crate::ffmpeg::MediaRunner;

/// Records every invocation and writes a placeholder file at the output path (the
/// last argument). Image-sequence outputs (`%05d`) get `frames` numbered files.
/// Failing invocations leave a truncated file behind, as FFmpeg does.
pub struct ScriptedRunner {
    calls: Mutex<Vec<Vec<String>>>,
    fail_patterns: Vec<String>,
    fail_calls: Vec<usize>,
    duration: Option<f64>,
    frames: usize,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_patterns: Vec::new(),
            fail_calls: Vec::new(),
            duration: Some(6.0),
            frames: 0,
        }
    }

    /// Fail any invocation with an argument containing `pattern`.
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_patterns.push(pattern.into());
        self
    }

    /// Fail the invocation with this zero-based index.
    pub fn fail_call(mut self, index: usize) -> Self {
        self.fail_calls.push(index);
        self
    }

    /// Duration reported by `inspect`; None prints `Duration: N/A`.
    pub fn with_duration(mut self, secs: Option<f64>) -> Self {
        self.duration = secs;
        self
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

fn banner_duration(secs: f64) -> String {
    let hours = (secs / 3600.0).floor();
    let minutes = ((secs - hours * 3600.0) / 60.0).floor();
    let seconds = secs - hours * 3600.0 - minutes * 60.0;
    format!("{:02}:{:02}:{:05.2}", hours as u64, minutes as u64, seconds)
}

impl MediaRunner for ScriptedRunner {
    fn run(&self, args: &[String]) -> Result<(), AppError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(args.to_vec());
            calls.len() - 1
        };
        let Some(output) = args.last() else {
            return Err(AppError::from("no output argument"));
        };
        let failing = self.fail_calls.contains(&index)
            || self
                .fail_patterns
                .iter()
                .any(|p| args.iter().any(|a| a.contains(p.as_str())));
        if failing {
            if !output.contains("%05d") {
                fs::write(output, b"partial")?;
            }
            return Err(AppError::ffmpeg_failed(1, "Error: scripted failure"));
        }
        if output.contains("%05d") {
            for n in 1..=self.frames {
                fs::write(output.replace("%05d", &format!("{:05}", n)), b"frame")?;
            }
        } else {
            fs::write(output, b"media")?;
        }
        Ok(())
    }

    fn inspect(&self, input: &Path) -> Result<String, AppError> {
        let duration = self
            .duration
            .map_or_else(|| "N/A".to_string(), banner_duration);
        Ok(format!(
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from '{}':\n  Duration: {}, start: 0.000000, bitrate: 512 kb/s\n",
            input.display(),
            duration
        ))
    }
}
