//! Generation engine: sentence mix, presets, effects in order, final encode.
//!
//! Every artifact a run creates is owned by its [`PipelineState`] and removed when
//! the state drops, whether the run succeeded or not.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assets::AssetIndex;
use crate::config::{EffectKind, GenerationConfig};
use crate::effects::{self, StepResult};
use crate::error::AppError;
use crate::ffmpeg::discovery::{find_ffplay, get_ffmpeg_path};
use crate::ffmpeg::probe::duration_or;
use crate::ffmpeg::{
    EncodeProfile, FfmpegRunner, Input, MediaRunner, TempFileManager, Transform,
    cleanup_old_temp_files, concat_list, play_blocking, remove_artifact,
};
use crate::randomize::randomize;
use crate::token::{self, TokenShape};

/// Work directory name under the system temp dir.
pub const DEFAULT_WORK_DIR: &str = "ytp_temp";
/// Leftovers older than this are removed when an engine starts.
pub const STALE_ARTIFACT_AGE: Duration = Duration::from_secs(24 * 60 * 60);
pub const PREVIEW_SECONDS: f64 = 6.0;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Explicit FFmpeg binary; discovered when absent.
    pub ffmpeg_path: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
    /// Seed for reproducible runs.
    pub seed: Option<u64>,
}

impl EngineOptions {
    pub fn effective_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_WORK_DIR))
    }
}

pub struct Engine {
    runner: Arc<dyn MediaRunner>,
    ffmpeg_path: Option<PathBuf>,
    temp: TempFileManager,
    assets: AssetIndex,
    rng: Mutex<StdRng>,
}

impl Engine {
    /// Resolve FFmpeg and build an engine around the real process runner.
    pub fn new(options: EngineOptions) -> Result<Self, AppError> {
        let ffmpeg = match &options.ffmpeg_path {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                return Err(AppError::FfmpegNotFound(format!(
                    "FFmpeg not found at {}",
                    path.display()
                )));
            }
            None => get_ffmpeg_path()?.to_path_buf(),
        };
        log::info!(target: "ytp::pipeline", "Using FFmpeg at {}", ffmpeg.display());
        let mut engine = Self::with_runner(Arc::new(FfmpegRunner::new(&ffmpeg)), options)?;
        engine.ffmpeg_path = Some(ffmpeg);
        Ok(engine)
    }

    /// Build an engine around any runner (dry-run printing, scripted fakes).
    pub fn with_runner(
        runner: Arc<dyn MediaRunner>,
        options: EngineOptions,
    ) -> Result<Self, AppError> {
        let temp = TempFileManager::new(options.effective_work_dir())?;
        cleanup_old_temp_files(temp.dir(), STALE_ARTIFACT_AGE);
        let assets = AssetIndex::locate(options.assets_dir.as_deref())
            .map(|dir| AssetIndex::scan(&dir))
            .unwrap_or_default();
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            runner,
            ffmpeg_path: options.ffmpeg_path,
            temp,
            assets,
            rng: Mutex::new(rng),
        })
    }

    pub fn ffmpeg_path(&self) -> Option<&Path> {
        self.ffmpeg_path.as_deref()
    }

    pub fn work_dir(&self) -> &Path {
        self.temp.dir()
    }

    pub fn assets(&self) -> &AssetIndex {
        &self.assets
    }

    /// Apply `config` to `input` and write the result to `output`.
    ///
    /// Effect failures are logged and skipped; only a failed final encode is an error.
    pub fn generate(
        &self,
        input: &Path,
        output: &Path,
        config: &GenerationConfig,
    ) -> Result<PathBuf, AppError> {
        if !input.is_file() {
            return Err(AppError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("input not found: {}", input.display()),
            )));
        }
        let scanned;
        let assets = match &config.assets_dir {
            Some(dir) => {
                scanned = AssetIndex::scan(dir);
                &scanned
            }
            None => &self.assets,
        };
        log::info!(
            target: "ytp::pipeline",
            "Generating {} from {}",
            output.display(),
            input.display()
        );

        let mut rng = self.rng.lock();
        let mut state =
            PipelineState::new(self.runner.as_ref(), &self.temp, assets, &mut rng, input);

        if config.sentence_mix.enabled {
            let result = effects::sentence_mix(&mut state, &config.sentence_mix);
            state.settle("sentence_mix", result);
        }
        if config.mode_2009 {
            let result = effects::preset_2009(&mut state, config);
            state.settle("mode_2009", result);
        }
        if config.mode_2012 {
            let result = effects::preset_2012(&mut state);
            state.settle("mode_2012", result);
        }

        for kind in EffectKind::ORDER {
            let gate = config.effects.gate(kind);
            if !gate.enabled() {
                continue;
            }
            let draw: f64 = state.rng().r#gen();
            if draw > gate.probability() {
                log::debug!(
                    target: "ytp::pipeline",
                    "{}: draw {:.3} above probability {:.3}",
                    kind,
                    draw,
                    gate.probability()
                );
                continue;
            }
            let result = effects::apply(kind, &mut state, &config.effects);
            state.settle(kind.name(), result);
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let encode = effects::final_transform(state.current());
        state.run_into(&encode, output).map_err(|e| {
            remove_artifact(output);
            log::error!(
                target: "ytp::pipeline",
                "Final encode of {} failed: {}",
                output.display(),
                e.summary()
            );
            AppError::EncodeFailed(format!("{}: {}", output.display(), e.summary()))
        })?;
        log::info!(target: "ytp::pipeline", "Wrote {}", output.display());
        Ok(output.to_path_buf())
    }

    /// Generate `count` randomized variants into `out_dir` as `ytp_auto_NNN.mp4`.
    ///
    /// The key comes from `key` or, when absent, from `beta_key.txt` in the
    /// working directory. Runs whose final encode fails are skipped.
    pub fn batch(
        &self,
        input: &Path,
        out_dir: &Path,
        base: &GenerationConfig,
        count: u32,
        key: Option<&str>,
    ) -> Result<Vec<PathBuf>, AppError> {
        let key = key
            .map(str::to_string)
            .or_else(|| token::read_token_file(Path::new(".")))
            .ok_or_else(|| {
                AppError::InvalidToken(format!(
                    "no key given and no {} found",
                    token::TOKEN_FILE
                ))
            })?;
        let Some(shape) = token::inspect(&key) else {
            return Err(AppError::InvalidToken("key has an unrecognized shape".to_string()));
        };
        if let TokenShape::Signed { user, .. } = &shape {
            if shape.is_expired() {
                log::warn!(
                    target: "ytp::pipeline",
                    "Beta key for {} has expired; accepting it because signatures are not verified",
                    user
                );
            } else {
                log::info!(
                    target: "ytp::pipeline",
                    "Signed beta key for {} (signature not verified)",
                    user
                );
            }
        }

        fs::create_dir_all(out_dir)?;
        let mut produced = Vec::new();
        for i in 1..=count {
            let output = out_dir.join(format!("ytp_auto_{:03}.mp4", i));
            let config = randomize(base, &mut *self.rng.lock());
            match self.generate(input, &output, &config) {
                Ok(path) => produced.push(path),
                Err(e) => log::warn!(
                    target: "ytp::pipeline",
                    "Batch run {}/{} skipped: {}",
                    i,
                    count,
                    e.summary()
                ),
            }
        }
        log::info!(
            target: "ytp::pipeline",
            "Batch finished: {}/{} outputs in {}",
            produced.len(),
            count,
            out_dir.display()
        );
        Ok(produced)
    }

    /// Play `file` with ffplay.
    pub fn preview(&self, file: &Path) -> Result<(), AppError> {
        let player = self
            .ffmpeg_path
            .as_deref()
            .and_then(find_ffplay)
            .ok_or_else(|| {
                AppError::FfmpegNotFound(format!(
                    "ffplay not found; open {} manually",
                    file.display()
                ))
            })?;
        play_blocking(&player, file)
    }

    /// Encode a short low-res look of `input` into the work dir and return it.
    /// The caller owns the returned file.
    pub fn render_preview(&self, input: &Path, seconds: f64) -> Result<PathBuf, AppError> {
        let output = self.temp.create(".mp4", None)?;
        let transform = effects::preview_transform(input, seconds);
        if let Err(e) = run_attempts(self.runner.as_ref(), &transform, &output) {
            remove_artifact(&output);
            return Err(e);
        }
        Ok(output)
    }

    /// Render the first `seconds` of `input` as a preview, play it, then delete it.
    pub fn preview_input(&self, input: &Path, seconds: f64) -> Result<(), AppError> {
        let rendered = self.render_preview(input, seconds)?;
        let result = self.preview(&rendered);
        remove_artifact(&rendered);
        result
    }
}

/// Run each attempt of `transform` against `output` until one succeeds.
fn run_attempts(
    runner: &dyn MediaRunner,
    transform: &Transform,
    output: &Path,
) -> Result<(), AppError> {
    let attempts = transform.attempts();
    let mut last_err = None;
    for (n, attempt) in attempts.iter().enumerate() {
        match runner.run(&attempt.build_args(output)) {
            Ok(()) => return Ok(()),
            Err(e) => {
                if n + 1 < attempts.len() {
                    log::debug!(
                        target: "ytp::pipeline",
                        "Attempt {} failed ({}), trying fallback",
                        n + 1,
                        e.summary()
                    );
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| AppError::from("transform has no attempts")))
}

/// Working file plus every artifact created during one run.
pub(crate) struct PipelineState<'a> {
    runner: &'a dyn MediaRunner,
    temp: &'a TempFileManager,
    assets: &'a AssetIndex,
    rng: &'a mut StdRng,
    current: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl<'a> PipelineState<'a> {
    pub(crate) fn new(
        runner: &'a dyn MediaRunner,
        temp: &'a TempFileManager,
        assets: &'a AssetIndex,
        rng: &'a mut StdRng,
        input: &Path,
    ) -> Self {
        Self {
            runner,
            temp,
            assets,
            rng,
            current: input.to_path_buf(),
            artifacts: Vec::new(),
        }
    }

    pub(crate) fn current(&self) -> &Path {
        &self.current
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    pub(crate) fn advance(&mut self, next: PathBuf) {
        self.current = next;
    }

    /// Remove every artifact except the working file.
    fn discard_superseded(&mut self) {
        let current = &self.current;
        self.artifacts.retain(|path| {
            if path == current {
                return true;
            }
            remove_artifact(path);
            false
        });
    }

    pub(crate) fn duration_or(&self, fallback: f64) -> f64 {
        duration_or(self.runner, &self.current, fallback)
    }

    pub(crate) fn pick_asset(&mut self, extensions: &[&str]) -> Option<PathBuf> {
        self.assets
            .pick(extensions, &mut *self.rng)
            .map(Path::to_path_buf)
    }

    /// The configured asset when it exists, otherwise a pick from the index.
    pub(crate) fn resolve_asset(
        &mut self,
        configured: Option<&Path>,
        extensions: &[&str],
    ) -> Option<PathBuf> {
        if let Some(path) = configured {
            if path.is_file() {
                return Some(path.to_path_buf());
            }
            log::warn!(
                target: "ytp::pipeline",
                "Configured asset {} does not exist, picking one instead",
                path.display()
            );
        }
        self.pick_asset(extensions)
    }

    pub(crate) fn temp_file(
        &mut self,
        suffix: &str,
        content: Option<&[u8]>,
    ) -> io::Result<PathBuf> {
        let path = self.temp.create(suffix, content)?;
        self.artifacts.push(path.clone());
        Ok(path)
    }

    pub(crate) fn temp_dir(&mut self, suffix: &str) -> io::Result<PathBuf> {
        let path = self.temp.create_dir(suffix)?;
        self.artifacts.push(path.clone());
        Ok(path)
    }

    pub(crate) fn run_into(&mut self, transform: &Transform, output: &Path) -> Result<(), AppError> {
        run_attempts(self.runner, transform, output)
    }

    /// Run `transform` into a fresh temp `.mp4` and return its path.
    pub(crate) fn run(&mut self, transform: &Transform) -> Result<PathBuf, AppError> {
        let output = self.temp_file(".mp4", None)?;
        self.run_into(transform, &output)?;
        Ok(output)
    }

    /// Splice `clips` with the concat demuxer; re-encodes when a plain copy fails.
    pub(crate) fn concat(&mut self, clips: &[PathBuf]) -> Result<PathBuf, AppError> {
        let list = self.temp_file(".txt", Some(concat_list(clips).as_bytes()))?;
        let transform = Transform::new(Input::concat(&list))
            .profile(EncodeProfile::STREAM_COPY)
            .or_profile(EncodeProfile::HIGH);
        self.run(&transform)
    }

    /// Adopt a step's result as the working file, or log why the step left it alone.
    /// Everything else the step (or an earlier one) produced is deleted.
    pub(crate) fn settle(&mut self, step: &str, result: StepResult) {
        match result {
            Ok(Some(next)) => {
                log::info!(target: "ytp::pipeline", "Applied {}", step);
                self.advance(next);
            }
            Ok(None) => {
                log::info!(target: "ytp::pipeline", "Skipped {}: nothing to apply", step);
            }
            Err(e) => {
                log::warn!(
                    target: "ytp::pipeline",
                    "{} failed, keeping previous file: {}",
                    step,
                    e.summary()
                );
            }
        }
        self.discard_superseded();
    }
}

impl Drop for PipelineState<'_> {
    fn drop(&mut self) {
        for path in self.artifacts.iter().rev() {
            remove_artifact(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Gated;
    use crate::test_support::ScriptedRunner;

    struct Fixture {
        _dir: tempfile::TempDir,
        work: PathBuf,
        assets: PathBuf,
        input: PathBuf,
        output: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let assets = dir.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        let input = dir.path().join("in.mp4");
        fs::write(&input, b"source").unwrap();
        let output = dir.path().join("out").join("result.mp4");
        Fixture {
            work,
            assets,
            input,
            output,
            _dir: dir,
        }
    }

    fn engine(fx: &Fixture, runner: &Arc<ScriptedRunner>, seed: u64) -> Engine {
        let runner: Arc<dyn MediaRunner> = runner.clone();
        Engine::with_runner(
            runner,
            EngineOptions {
                work_dir: Some(fx.work.clone()),
                assets_dir: Some(fx.assets.clone()),
                seed: Some(seed),
                ..EngineOptions::default()
            },
        )
        .unwrap()
    }

    fn only(kind: EffectKind) -> GenerationConfig {
        let mut config = GenerationConfig::default();
        config.enable(kind);
        config.effects.gate_mut(kind).set_probability(1.0);
        config
    }

    fn leftovers(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    fn input_of(call: &[String]) -> &str {
        let i = call.iter().position(|a| a == "-i").unwrap();
        &call[i + 1]
    }

    #[test]
    fn disabled_config_only_runs_final_encode() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 1);
        let out = engine
            .generate(&fx.input, &fx.output, &GenerationConfig::default())
            .unwrap();
        assert_eq!(out, fx.output);
        assert!(fx.output.is_file(), "output dir should be created");

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(input_of(&calls[0]), fx.input.to_string_lossy());
        assert!(calls[0].contains(&"libx264".to_string()));
        assert_eq!(calls[0].last().unwrap(), &fx.output.to_string_lossy());
    }

    #[test]
    fn failed_step_is_skipped_and_cleaned_up() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new().fail_on("areverse"));
        let engine = engine(&fx, &runner, 2);
        engine
            .generate(&fx.input, &fx.output, &only(EffectKind::Reverse))
            .unwrap();

        let calls = runner.calls();
        // primary + fallback for reverse, then the final encode on the untouched input
        assert_eq!(calls.len(), 3);
        assert_eq!(input_of(&calls[2]), fx.input.to_string_lossy());
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn successful_steps_chain_and_leave_nothing_behind() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 3);
        let mut config = only(EffectKind::Reverse);
        config.enable(EffectKind::Mirror);
        config.effects.mirror.set_probability(1.0);
        engine.generate(&fx.input, &fx.output, &config).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].contains(&"areverse".to_string()));
        assert!(calls[1].contains(&"hflip".to_string()));
        assert_eq!(input_of(&calls[1]), calls[0].last().unwrap());
        assert_eq!(input_of(&calls[2]), calls[1].last().unwrap());
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn stutter_splices_through_concat_list() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 4);
        engine
            .generate(&fx.input, &fx.output, &only(EffectKind::Stutter))
            .unwrap();

        let calls = runner.calls();
        let concat = calls
            .iter()
            .find(|c| c.contains(&"concat".to_string()))
            .expect("concat call");
        assert!(concat.contains(&"copy".to_string()));
        let last = calls.last().unwrap();
        assert_ne!(input_of(last), fx.input.to_string_lossy());
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn sentence_mix_cuts_requested_parts() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 13);
        let mut config = GenerationConfig::default();
        config.sentence_mix.enabled = true;
        config.sentence_mix.parts = Some(3);
        engine.generate(&fx.input, &fx.output, &config).unwrap();

        let calls = runner.calls();
        // three clips, the splice, the final encode
        assert_eq!(calls.len(), 5);
        for clip in &calls[..3] {
            assert!(clip.contains(&"-ss".to_string()));
            // 6s source over 3 parts gives 1s clips
            assert!(clip.contains(&"1.000".to_string()));
        }
        assert!(calls[3].contains(&"concat".to_string()));
    }

    #[test]
    fn zero_probability_never_fires() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 5);
        let mut config = only(EffectKind::Invert);
        config.effects.invert.set_probability(0.0);
        engine.generate(&fx.input, &fx.output, &config).unwrap();
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn missing_asset_skips_effect() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 6);
        engine
            .generate(&fx.input, &fx.output, &only(EffectKind::Caption))
            .unwrap();
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn indexed_asset_is_used_when_none_configured() {
        let fx = fixture();
        fs::write(fx.assets.join("boom.wav"), b"wav").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 7);
        let mut config = only(EffectKind::AudioMix);
        config.effects.audio_mix.count = Some(2);
        engine.generate(&fx.input, &fx.output, &config).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].iter().any(|a| a.ends_with("boom.wav")));
        assert!(calls[0].contains(&"-itsoffset".to_string()));
    }

    #[test]
    fn frame_shuffle_reassembles_extracted_frames() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new().with_frames(12));
        let engine = engine(&fx, &runner, 8);
        engine
            .generate(&fx.input, &fx.output, &only(EffectKind::FrameShuffle))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].last().unwrap().ends_with("frame_%05d.png"));
        assert!(calls[1].contains(&"-framerate".to_string()));
        assert!(calls[1].contains(&"1:a?".to_string()));
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn final_encode_failure_is_an_error() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new().fail_on("result.mp4"));
        let engine = engine(&fx, &runner, 9);
        let err = engine
            .generate(&fx.input, &fx.output, &only(EffectKind::Mirror))
            .unwrap_err();
        assert!(matches!(err, AppError::EncodeFailed(_)));
        assert!(!fx.output.exists(), "partial output should be removed");
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn speed_jitter_second_stage_failure_keeps_pre_effect_file() {
        let fx = fixture();
        // stage two and its fallback
        let runner = Arc::new(ScriptedRunner::new().fail_call(1).fail_call(2));
        let engine = engine(&fx, &runner, 14);
        engine
            .generate(&fx.input, &fx.output, &only(EffectKind::SpeedJitter))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(input_of(&calls[1]), calls[0].last().unwrap());
        assert_eq!(input_of(&calls[3]), fx.input.to_string_lossy());
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn audio_mix_failure_midway_keeps_pre_effect_file() {
        let fx = fixture();
        fs::write(fx.assets.join("boom.wav"), b"wav").unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail_call(1).fail_call(2));
        let engine = engine(&fx, &runner, 15);
        let mut config = only(EffectKind::AudioMix);
        config.effects.audio_mix.count = Some(2);
        engine.generate(&fx.input, &fx.output, &config).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(input_of(&calls[3]), fx.input.to_string_lossy());
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn stutter_splice_failure_keeps_pre_effect_file() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new().fail_on("concat"));
        let engine = engine(&fx, &runner, 16);
        engine
            .generate(&fx.input, &fx.output, &only(EffectKind::Stutter))
            .unwrap();

        let last = runner.calls().pop().unwrap();
        assert_eq!(input_of(&last), fx.input.to_string_lossy());
        assert!(leftovers(&fx.work).is_empty());
    }

    /// Counts work-dir entries at each invocation before delegating.
    struct CountingRunner {
        inner: ScriptedRunner,
        work: PathBuf,
        seen: Mutex<Vec<usize>>,
    }

    impl MediaRunner for CountingRunner {
        fn run(&self, args: &[String]) -> Result<(), AppError> {
            self.seen.lock().push(leftovers(&self.work).len());
            self.inner.run(args)
        }

        fn inspect(&self, input: &Path) -> Result<String, AppError> {
            self.inner.inspect(input)
        }
    }

    #[test]
    fn superseded_working_files_are_removed_between_steps() {
        let fx = fixture();
        let counting = Arc::new(CountingRunner {
            inner: ScriptedRunner::new(),
            work: fx.work.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let runner: Arc<dyn MediaRunner> = counting.clone();
        let engine = Engine::with_runner(
            runner,
            EngineOptions {
                work_dir: Some(fx.work.clone()),
                assets_dir: Some(fx.assets.clone()),
                seed: Some(17),
                ..EngineOptions::default()
            },
        )
        .unwrap();
        let mut config = GenerationConfig::default();
        for kind in [
            EffectKind::Reverse,
            EffectKind::Invert,
            EffectKind::Mirror,
            EffectKind::TransformJitter,
        ] {
            config.enable(kind);
            config.effects.gate_mut(kind).set_probability(1.0);
        }
        engine.generate(&fx.input, &fx.output, &config).unwrap();

        // the new output alongside at most one previous working file
        assert_eq!(*counting.seen.lock(), vec![1, 2, 2, 2, 1]);
        assert!(leftovers(&fx.work).is_empty());
    }

    #[test]
    fn same_seed_same_invocations() {
        let fx = fixture();
        let mut config = only(EffectKind::Stutter);
        config.enable(EffectKind::SpeedJitter);
        let a = Arc::new(ScriptedRunner::new());
        engine(&fx, &a, 42)
            .generate(&fx.input, &fx.output, &config)
            .unwrap();
        let b = Arc::new(ScriptedRunner::new());
        engine(&fx, &b, 42)
            .generate(&fx.input, &fx.output, &config)
            .unwrap();
        let strip = |calls: Vec<Vec<String>>| -> Vec<String> {
            calls
                .into_iter()
                .flatten()
                .filter(|a| !a.contains("ytp-"))
                .collect()
        };
        assert_eq!(strip(a.calls()), strip(b.calls()));
    }

    #[test]
    fn batch_rejects_bad_token_before_work() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 10);
        let out_dir = fx.output.parent().unwrap().to_path_buf();
        let err = engine
            .batch(&fx.input, &out_dir, &GenerationConfig::default(), 2, Some("short"))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));
        assert!(runner.calls().is_empty());
        assert!(!out_dir.exists());
    }

    #[test]
    fn batch_numbers_outputs_and_skips_failed_runs() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new().fail_on("ytp_auto_002.mp4"));
        let engine = engine(&fx, &runner, 11);
        let out_dir = fx.output.parent().unwrap().to_path_buf();
        let produced = engine
            .batch(&fx.input, &out_dir, &GenerationConfig::default(), 3, Some("OLD-abcd1234"))
            .unwrap();
        assert_eq!(
            produced,
            vec![out_dir.join("ytp_auto_001.mp4"), out_dir.join("ytp_auto_003.mp4")]
        );
        assert!(!out_dir.join("ytp_auto_002.mp4").exists());
    }

    #[test]
    fn render_preview_uses_short_low_res_encode() {
        let fx = fixture();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(&fx, &runner, 12);
        let rendered = engine.render_preview(&fx.input, PREVIEW_SECONDS).unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains(&"ultrafast".to_string()));
        assert!(calls[0].contains(&"6.000".to_string()));
        assert!(rendered.is_file());
        remove_artifact(&rendered);
    }
}
