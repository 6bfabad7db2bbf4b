//! Output integrity check via FFmpeg decode-to-null.
//!
//! A valid file decodes without errors; corruption produces errors on stderr and a non-zero exit.

use std::path::Path;
use std::process::Command;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

use super::path_to_string;
use crate::error::AppError;

/// Decode `path` fully and discard the result. Ok when FFmpeg reports no errors.
pub fn verify_video(ffmpeg: &Path, path: &Path) -> Result<(), AppError> {
    let path_str = path_to_string(path);
    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-v", "error", "-nostdin", "-i", &path_str, "-f", "null", "-"]);
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
    let output = cmd
        .output()
        .map_err(|e| format!("Failed to spawn FFmpeg: {}", e))?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code().unwrap_or(-1);
    if output.status.success() && !stderr.to_lowercase().contains("error") {
        log::debug!(
            target: "ytp::ffmpeg::verify",
            "{} decoded cleanly",
            path.display()
        );
        return Ok(());
    }
    Err(AppError::ffmpeg_failed(
        exit_code,
        format!("Video verification failed: {}", stderr.trim()),
    ))
}
