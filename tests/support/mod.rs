#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use ytp_core::ffmpeg::probe::probe_duration;
use ytp_core::ffmpeg::FfmpegRunner;
use ytp_core::{Engine, EngineOptions};

/// Real FFmpeg plus a scratch directory holding inputs, outputs and the engine work dir.
pub struct IntegrationEnv {
    pub ffmpeg: PathBuf,
    dir: tempfile::TempDir,
}

impl IntegrationEnv {
    pub fn new() -> Self {
        let ffmpeg = ytp_core::ffmpeg::discovery::get_ffmpeg_path()
            .expect("FFmpeg not found")
            .to_path_buf();
        let dir = tempfile::tempdir().expect("tempdir");
        Self { ffmpeg, dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path("work")
    }

    pub fn engine(&self, seed: u64) -> Engine {
        Engine::new(EngineOptions {
            ffmpeg_path: Some(self.ffmpeg.clone()),
            work_dir: Some(self.work_dir()),
            assets_dir: Some(self.path("assets")),
            seed: Some(seed),
        })
        .expect("engine")
    }

    /// testsrc video with a sine audio track.
    pub fn with_test_video(&self, name: &str, duration_secs: f32) -> PathBuf {
        let output_path = self.path(name);
        let status = create_test_video(&self.ffmpeg, &output_path, duration_secs)
            .expect("failed to create test video");
        assert!(status.success(), "ffmpeg failed to create test video");
        output_path
    }

    pub fn duration(&self, path: &Path) -> f64 {
        probe_duration(&FfmpegRunner::new(&self.ffmpeg), path).expect("probe duration")
    }

    /// Names left in the engine work dir.
    pub fn leftovers(&self) -> Vec<String> {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn create_test_video(
    ffmpeg: &Path,
    output_path: &Path,
    duration_secs: f32,
) -> std::io::Result<ExitStatus> {
    let duration_arg = format!("{}", duration_secs);
    Command::new(ffmpeg)
        .args([
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            &format!("testsrc=duration={}:size=320x240:rate=25", duration_arg),
            "-f",
            "lavfi",
            "-i",
            &format!("sine=frequency=440:duration={}", duration_arg),
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-shortest",
            output_path.to_string_lossy().as_ref(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}
