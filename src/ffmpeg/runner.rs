//! FFmpeg process spawning.
//!
//! Every media step goes through [`MediaRunner`]. The real implementation spawns
//! FFmpeg as a child process, drains stderr on a background thread (keeping only
//! the tail) and blocks until the process exits. There is no timeout.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

use parking_lot::Mutex;

use super::path_to_string;
use crate::error::AppError;

/// Keep only the last N bytes of stderr to avoid unbounded memory growth.
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// The process boundary. `run` succeeds iff the tool exits with code zero.
pub trait MediaRunner: Send + Sync {
    /// Run the media tool with `args` (the binary itself is implied).
    fn run(&self, args: &[String]) -> Result<(), AppError>;

    /// Run the tool in inspection mode on `input` and return its diagnostic text.
    /// A non-zero exit is expected here (no output file is given) and is not an error.
    fn inspect(&self, input: &Path) -> Result<String, AppError>;
}

pub struct FfmpegRunner {
    ffmpeg: PathBuf,
}

impl FfmpegRunner {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        #[cfg(windows)]
        cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
        cmd
    }
}

fn drain_stderr<R: std::io::Read + Send + 'static>(
    reader: R,
    buffer: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stream_reader = BufReader::new(reader);
        let mut line_buf = Vec::with_capacity(256);
        while stream_reader.read_until(b'\n', &mut line_buf).unwrap_or(0) > 0 {
            let mut guard = buffer.lock();
            guard.extend_from_slice(&line_buf);
            if guard.len() > MAX_STDERR_BYTES {
                let excess = guard.len() - MAX_STDERR_BYTES;
                guard.drain(..excess);
            }
            drop(guard);
            line_buf.clear();
        }
    })
}

impl MediaRunner for FfmpegRunner {
    fn run(&self, args: &[String]) -> Result<(), AppError> {
        let input_arg = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1));
        log::debug!(
            target: "ytp::ffmpeg::runner",
            "Spawning FFmpeg: input={:?}, output={:?}",
            input_arg,
            args.last()
        );
        log::trace!(target: "ytp::ffmpeg::runner", "args: {}", args.join(" "));

        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to spawn FFmpeg: {}", e))?;

        let stderr = match child.stderr.take() {
            Some(s) => s,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AppError::from("Failed to capture stderr"));
            }
        };
        let stderr_buffer = Arc::new(Mutex::new(Vec::new()));
        let stderr_handle = drain_stderr(stderr, Arc::clone(&stderr_buffer));

        let status = child.wait()?;
        let _ = stderr_handle.join();

        if status.success() {
            log::debug!(target: "ytp::ffmpeg::runner", "FFmpeg completed successfully");
            return Ok(());
        }

        let stderr_str = String::from_utf8_lossy(&stderr_buffer.lock()).to_string();
        let code = status.code().unwrap_or(-1);
        let err_preview = stderr_str
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .join("; ");
        log::debug!(
            target: "ytp::ffmpeg::runner",
            "FFmpeg failed (code={}): {}",
            code,
            err_preview
        );
        Err(AppError::ffmpeg_failed(code, stderr_str))
    }

    fn inspect(&self, input: &Path) -> Result<String, AppError> {
        let output = self
            .command()
            .args(["-hide_banner", "-nostdin", "-i", &path_to_string(input)])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("Failed to spawn FFmpeg: {}", e))?;
        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        Ok(text)
    }
}

/// Prints each invocation instead of running it. Inspection yields no duration.
pub struct DryRunRunner;

impl MediaRunner for DryRunRunner {
    fn run(&self, args: &[String]) -> Result<(), AppError> {
        println!("ffmpeg {}\n", super::format_args_for_display(args));
        Ok(())
    }

    fn inspect(&self, _input: &Path) -> Result<String, AppError> {
        Ok(String::new())
    }
}

/// Launch a player (ffplay) on `file` and wait for it to exit.
pub fn play_blocking(player: &Path, file: &Path) -> Result<(), AppError> {
    log::info!(
        target: "ytp::ffmpeg::runner",
        "Playing {} with {}",
        file.display(),
        player.display()
    );
    let status = Command::new(player)
        .args(["-autoexit", &path_to_string(file)])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(AppError::ffmpeg_failed(
            status.code().unwrap_or(-1),
            "player exited with an error",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_maps_to_code_minus_one() {
        let runner = FfmpegRunner::new("/definitely/not/here/ffmpeg");
        match runner.run(&["-version".to_string()]) {
            Err(AppError::FfmpegFailed { code, stderr }) => {
                assert_eq!(code, -1);
                assert!(stderr.contains("Failed to spawn"));
            }
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }

    #[test]
    fn non_zero_exit_is_failure_with_stderr() {
        // `sh -c` stands in for the media tool so the exit-code mapping can be checked.
        let runner = FfmpegRunner::new("/bin/sh");
        let args = vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()];
        match runner.run(&args) {
            Err(AppError::FfmpegFailed { code, stderr }) => {
                assert_eq!(code, 3);
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn zero_exit_is_success() {
        let runner = FfmpegRunner::new("/bin/sh");
        assert!(runner.run(&["-c".to_string(), "exit 0".to_string()]).is_ok());
    }
}
