use crate::error::AppError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

#[cfg(target_os = "windows")]
const LOOKUP_COMMAND: &str = "where";
#[cfg(not(target_os = "windows"))]
const LOOKUP_COMMAND: &str = "which";

/// Ask the platform lookup command (`which` / `where`) for a binary on PATH.
fn find_in_path(binary: &str) -> Option<PathBuf> {
    let output = Command::new(LOOKUP_COMMAND).arg(binary).output().ok()?;
    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout);
        let first = path.lines().next()?.trim();
        if !first.is_empty() {
            return Some(PathBuf::from(first));
        }
    }
    None
}

fn common_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/opt/local/bin"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin"),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![PathBuf::from("/usr/bin"), PathBuf::from("/usr/local/bin")]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
    {
        vec![]
    }
}

fn executable_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

/// Binary next to the running executable, so a portable bundle with ffmpeg beside it works.
fn beside_executable(base: &str) -> Option<PathBuf> {
    let exe_dir = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let path = exe_dir.join(executable_name(base));
    path.exists().then_some(path)
}

/// Resolve a media binary: common install dirs, then PATH, then next to the executable.
fn resolve_binary(base: &str) -> Option<PathBuf> {
    let name = executable_name(base);
    for dir in common_dirs() {
        let path = dir.join(&name);
        if path.exists() {
            log::debug!(
                target: "ytp::ffmpeg::discovery",
                "{} found in common path: {}",
                base,
                path.display()
            );
            return Some(path);
        }
    }

    if let Some(p) = find_in_path(base)
        && p.exists()
    {
        log::debug!(
            target: "ytp::ffmpeg::discovery",
            "{} found in PATH: {}",
            base,
            p.display()
        );
        return Some(p);
    }

    beside_executable(base)
}

fn not_found() -> AppError {
    log::error!(
        target: "ytp::ffmpeg::discovery",
        "FFmpeg not found in PATH or common locations"
    );
    AppError::FfmpegNotFound(
        "FFmpeg not found. Place ffmpeg on PATH or next to the executable, or set FFMPEG_PATH:\n  - macOS: brew install ffmpeg\n  - Linux: sudo apt install ffmpeg\n  - Windows: Download from https://ffmpeg.org/download.html"
            .to_string(),
    )
}

/// Resolve FFmpeg without caching. FFMPEG_PATH takes precedence when it points at a file.
pub fn resolve_ffmpeg_path() -> Result<PathBuf, AppError> {
    if let Ok(env_path) = std::env::var("FFMPEG_PATH") {
        let p = PathBuf::from(&env_path);
        if p.is_file() {
            log::debug!(
                target: "ytp::ffmpeg::discovery",
                "FFmpeg path from FFMPEG_PATH env: {}",
                p.display()
            );
            return Ok(p);
        }
        log::warn!(
            target: "ytp::ffmpeg::discovery",
            "FFMPEG_PATH={} does not exist, falling back to discovery",
            env_path
        );
    }
    resolve_binary("ffmpeg").ok_or_else(not_found)
}

static FFMPEG_PATH_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get FFmpeg path. Cached for process lifetime.
pub fn get_ffmpeg_path() -> Result<&'static Path, AppError> {
    if let Some(path) = FFMPEG_PATH_CACHE.get() {
        return Ok(path.as_path());
    }
    let path = resolve_ffmpeg_path()?;
    Ok(FFMPEG_PATH_CACHE.get_or_init(|| path).as_path())
}

/// Paths to try for a sibling tool (ffplay, ffprobe) given an ffmpeg binary path.
/// A platform suffix on ffmpeg (e.g. ffmpeg-x86_64-unknown-linux-gnu) is tried first.
pub fn sibling_candidates(ffmpeg_path: &Path, tool: &str) -> Vec<PathBuf> {
    let parent = match ffmpeg_path.parent() {
        Some(p) => p,
        None => return vec![],
    };
    let mut candidates = Vec::with_capacity(2);
    if let Some(suffix) = ffmpeg_path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.strip_prefix("ffmpeg"))
        .filter(|suffix| !suffix.is_empty())
    {
        candidates.push(parent.join(executable_name(&format!("{tool}{suffix}"))));
    }
    candidates.push(parent.join(executable_name(tool)));
    candidates
}

/// Locate ffplay for previews: beside ffmpeg first, then the usual lookup. None when absent.
pub fn find_ffplay(ffmpeg_path: &Path) -> Option<PathBuf> {
    sibling_candidates(ffmpeg_path, "ffplay")
        .into_iter()
        .find(|p| p.exists())
        .or_else(|| resolve_binary("ffplay"))
}
