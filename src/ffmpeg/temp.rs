use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Prefix shared by every artifact this crate creates, so stale ones can be recognized.
pub const TEMP_PREFIX: &str = "ytp-";

static NEXT_TEMP_ID: AtomicU64 = AtomicU64::new(0);

/// Creates uniquely named files and directories inside one work directory.
/// Paths must be handed to a pipeline state (or removed by the caller) for cleanup.
#[derive(Debug, Clone)]
pub struct TempFileManager {
    dir: PathBuf,
}

impl TempFileManager {
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = std::path::absolute(dir.as_ref())?;
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_name(&self, suffix: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let id = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            "{}{}-{}-{}{}",
            TEMP_PREFIX,
            std::process::id(),
            millis,
            id,
            suffix
        ))
    }

    /// Reserve a new empty file ending in `suffix` (e.g. ".mp4"), optionally with content.
    pub fn create(&self, suffix: &str, content: Option<&[u8]>) -> io::Result<PathBuf> {
        loop {
            let path = self.unique_name(suffix);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Some(data) = content {
                        file.write_all(data)?;
                    }
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Create a new empty directory whose name ends in `suffix`.
    pub fn create_dir(&self, suffix: &str) -> io::Result<PathBuf> {
        loop {
            let path = self.unique_name(suffix);
            match fs::create_dir(&path) {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// One concat-demuxer line: `file '<path>'` with embedded single quotes escaped.
pub fn concat_list_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', "'\\''");
    format!("file '{}'", escaped)
}

/// Contents of a concat list file, one line per clip in order.
pub fn concat_list(clips: &[PathBuf]) -> String {
    let mut out = String::new();
    for clip in clips {
        out.push_str(&concat_list_line(clip));
        out.push('\n');
    }
    out
}

/// Remove a temp file or directory, ignoring anything already gone.
pub fn remove_artifact(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result
        && e.kind() != io::ErrorKind::NotFound
    {
        log::warn!(
            target: "ytp::ffmpeg::temp",
            "Failed to remove {}: {}",
            path.display(),
            e
        );
    }
}

/// Remove artifacts left in `dir` by earlier (crashed) runs. Returns how many were removed.
pub fn cleanup_old_temp_files(dir: &Path, max_age: Duration) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(TEMP_PREFIX) {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).ok();
        let stale = modified
            .and_then(|m| now.duration_since(m).ok())
            .is_some_and(|age| age >= max_age);
        if stale {
            remove_artifact(&entry.path());
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!(
            target: "ytp::ffmpeg::temp",
            "Removed {} stale temp artifacts from {}",
            removed,
            dir.display()
        );
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_returns_distinct_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFileManager::new(dir.path()).unwrap();
        let a = temp.create(".mp4", None).unwrap();
        let b = temp.create(".mp4", Some(b"hello")).unwrap();
        assert_ne!(a, b);
        assert!(a.exists());
        assert_eq!(fs::read(&b).unwrap(), b"hello");
        assert!(a.file_name().unwrap().to_string_lossy().starts_with(TEMP_PREFIX));
        assert!(a.to_string_lossy().ends_with(".mp4"));
    }

    #[test]
    fn concat_line_escapes_single_quotes() {
        let line = concat_list_line(Path::new("/tmp/it's here.mp4"));
        assert_eq!(line, "file '/tmp/it'\\''s here.mp4'");
    }

    #[test]
    fn concat_list_keeps_order_and_repeats() {
        let clips = vec![
            PathBuf::from("/a.mp4"),
            PathBuf::from("/b.mp4"),
            PathBuf::from("/b.mp4"),
        ];
        assert_eq!(
            concat_list(&clips),
            "file '/a.mp4'\nfile '/b.mp4'\nfile '/b.mp4'\n"
        );
    }

    #[test]
    fn remove_artifact_handles_dirs_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFileManager::new(dir.path()).unwrap();
        let frames = temp.create_dir("-frames").unwrap();
        fs::write(frames.join("frame_00001.png"), b"x").unwrap();
        remove_artifact(&frames);
        assert!(!frames.exists());
        remove_artifact(&frames);
    }

    #[test]
    fn cleanup_old_only_touches_prefixed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFileManager::new(dir.path()).unwrap();
        let ours = temp.create(".mp4", None).unwrap();
        let foreign = dir.path().join("keep.mp4");
        fs::write(&foreign, b"x").unwrap();
        let removed = cleanup_old_temp_files(dir.path(), Duration::ZERO);
        assert_eq!(removed, 1);
        assert!(!ours.exists());
        assert!(foreign.exists());
    }
}
