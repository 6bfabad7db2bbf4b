//! Overlay/audio asset index: files under an asset directory bucketed by extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use walkdir::WalkDir;

/// Default asset directory, relative to the working directory.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".gif", ".jpg"];
pub const CAPTION_EXTENSIONS: &[&str] = &[".png", ".jpg", ".gif"];
pub const SOUND_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".ogg", ".aac"];

/// Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    by_extension: BTreeMap<String, Vec<PathBuf>>,
}

/// Lowercase, dot-prefixed form: "PNG" and ".png" both become ".png".
fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_ascii_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

impl AssetIndex {
    /// Walk `dir` recursively once. A missing or unreadable directory yields an empty index.
    pub fn scan(dir: &Path) -> Self {
        let mut index = Self::default();
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            index.insert(ext, path);
        }
        log::debug!(
            target: "ytp::assets",
            "Indexed {} assets under {} ({} extensions)",
            index.len(),
            dir.display(),
            index.by_extension.len()
        );
        index
    }

    /// The asset directory to use: an explicit override, else `./assets` when present.
    pub fn locate(override_dir: Option<&Path>) -> Option<PathBuf> {
        match override_dir {
            Some(dir) => Some(dir.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_ASSETS_DIR);
                default.is_dir().then_some(default)
            }
        }
    }

    pub fn insert(&mut self, ext: &str, path: PathBuf) {
        self.by_extension
            .entry(normalize_extension(ext))
            .or_default()
            .push(path);
    }

    pub fn len(&self) -> usize {
        self.by_extension.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, ext: &str) -> &[PathBuf] {
        self.by_extension
            .get(&normalize_extension(ext))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Uniform choice among the first preferred extension that has matches; otherwise
    /// uniform among every indexed asset. None only when the index is empty.
    pub fn pick<R: Rng + ?Sized>(&self, preferred: &[&str], rng: &mut R) -> Option<&Path> {
        for ext in preferred {
            if let Some(path) = self.get(ext).choose(rng) {
                return Some(path.as_path());
            }
        }
        let all: Vec<&PathBuf> = self.by_extension.values().flatten().collect();
        all.choose(rng).copied().map(PathBuf::as_path)
    }
}
