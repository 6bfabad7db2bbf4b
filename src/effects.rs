//! Effect handlers.
//!
//! Filter-string builders are pure and tested directly. Each handler turns the
//! current working file into one or more [`Transform`]s and runs them through the
//! pipeline state, returning the new working file or `None` when it had nothing
//! to do (typically a missing asset).

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::assets::{CAPTION_EXTENSIONS, IMAGE_EXTENSIONS, SOUND_EXTENSIONS};
use crate::config::{Coord, EffectKind, EffectsConfig, GenerationConfig, SentenceMix};
use crate::error::AppError;
use crate::ffmpeg::{AudioCodec, EncodeProfile, Input, Transform, VideoCodec};
use crate::pipeline::PipelineState;

pub(crate) type StepResult = Result<Option<PathBuf>, AppError>;

const SAMPLE_RATE: u32 = 44100;
const SPAM_BURST_SECS: f64 = 0.6;
const SOUND_TAIL_SECS: f64 = 0.5;
const SHUFFLE_FPS: u32 = 25;
const FRAME_PATTERN: &str = "frame_%05d.png";

const SENTENCE_MIX_FALLBACK_SECS: f64 = 6.0;
const STUTTER_FALLBACK_SECS: f64 = 5.0;
const SPAM_FALLBACK_SECS: f64 = 5.0;
const AUDIO_MIX_FALLBACK_SECS: f64 = 6.0;

/// Clips shorter than this are dropped from a stutter splice.
const MIN_CLIP_SECS: f64 = 0.05;
const MAX_STUTTER_REPEATS: usize = 64;

pub const PRESET_2009_FILTER: &str =
    "scale=640:-2,eq=contrast=1.2:brightness=0.02:saturation=1.4,format=yuv420p";
pub const PRESET_2012_FILTER: &str = "scale=720:-2,eq=contrast=1.3:saturation=0.9,format=yuv420p";
pub const PREVIEW_FILTER: &str =
    "scale=480:-2,format=yuv420p,eq=contrast=1.05:brightness=0.01:saturation=1.2";

const INVERT_FALLBACK_FILTER: &str = "lutrgb='r=255-val:g=255-val:b=255-val'";
const SHRINK_FILTER: &str = "scale=trunc(iw*0.95/2)*2:trunc(ih*0.95/2)*2";
const CAPTION_POSITION: &str = "(main_w-overlay_w)/2:(main_h-overlay_h)-10";

/// Factors at or below zero (and NaN/inf) mean "unchanged".
pub fn sanitize_speed(factor: f64) -> f64 {
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    }
}

/// Split a tempo factor into `atempo` stages that each stay within [0.5, 2.0].
pub fn atempo_chain(factor: f64) -> Vec<f64> {
    let mut remaining = sanitize_speed(factor);
    let mut stages = Vec::new();
    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining *= 2.0;
    }
    stages.push(remaining);
    stages
}

pub fn atempo_filter(factor: f64) -> String {
    let factor = sanitize_speed(factor);
    if factor == 1.0 {
        return "anull".to_string();
    }
    atempo_chain(factor)
        .iter()
        .map(|stage| format!("atempo={}", stage))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn setpts_filter(factor: f64) -> String {
    format!("setpts={:.6}*PTS", 1.0 / sanitize_speed(factor))
}

pub fn chorus_filter(level: f64) -> String {
    let d1 = (30.0 + 400.0 * level).floor() as i64;
    let d2 = (90.0 + 500.0 * level).floor() as i64;
    let k1 = 0.4 + 0.3 * level;
    let k2 = 0.2 + 0.25 * level;
    format!("aecho=0.8:0.9:{}|{}:{:.2}|{:.2}", d1, d2, k1, k2)
}

pub fn pitch_filter(level: f64) -> String {
    let level = if level > 0.0 && level.is_finite() {
        level
    } else {
        1.03
    };
    format!(
        "asetrate={}*{},aresample={},{}",
        SAMPLE_RATE,
        level,
        SAMPLE_RATE,
        atempo_filter(1.0 / level)
    )
}

pub fn volume_filter(db: f64) -> String {
    format!("volume={}dB", db)
}

pub fn transform_jitter_filter() -> String {
    format!("transpose=1,{}", SHRINK_FILTER)
}

/// Overlay graph for a second input; partially transparent overlays get an alpha pass.
pub fn overlay_graph(x: &Coord, y: &Coord, opacity: f64) -> String {
    if opacity >= 0.99 {
        format!("overlay={}:{}", x, y)
    } else {
        format!(
            "[1]format=rgba,colorchannelmixer=aa={}[ol];[0][ol]overlay={}:{}",
            opacity, x, y
        )
    }
}

pub fn spam_burst_graph(x: u32, y: u32, start: f64, end: f64) -> String {
    format!(
        "overlay={}:{}:enable='between(t,{:.3},{:.3})'",
        x, y, start, end
    )
}

pub fn stutter_segment_secs(level: f64) -> f64 {
    (0.1 * level).clamp(0.05, 0.6)
}

pub fn stutter_repeats(level: f64) -> usize {
    let extra = level.max(0.0).min((MAX_STUTTER_REPEATS - 2) as f64);
    2 + extra.trunc() as usize
}

pub fn sentence_clip_secs(duration: f64, parts: u32) -> f64 {
    (duration / (f64::from(parts) * 2.0)).clamp(0.15, 1.5)
}

/// Swap pairs `(i, sel[i])` where `sel` is the head of a random permutation of
/// `0..frame_count`, `min(frame_count, trunc(level))` long. Identity pairs are omitted.
pub fn shuffle_plan<R: Rng + ?Sized>(
    frame_count: usize,
    level: f64,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let take = frame_count.min(level.max(0.0).min(frame_count as f64).trunc() as usize);
    let mut order: Vec<usize> = (0..frame_count).collect();
    order.shuffle(rng);
    order
        .into_iter()
        .take(take)
        .enumerate()
        .filter(|(i, j)| i != j)
        .collect()
}

fn uniform_start<R: Rng + ?Sized>(rng: &mut R, upper: f64) -> f64 {
    if upper > 0.0 {
        rng.gen_range(0.0..=upper)
    } else {
        0.0
    }
}

fn reencode(input: &Path) -> Transform {
    Transform::new(Input::file(input))
}

fn video_step(input: &Path, filter: impl Into<String>) -> Transform {
    reencode(input)
        .video_filter(filter)
        .profile(EncodeProfile::VIDEO_ONLY)
        .or_profile(EncodeProfile::VIDEO_ONLY_COMPATIBLE)
}

fn audio_step(input: &Path, filter: impl Into<String>) -> Transform {
    reencode(input)
        .audio_filter(filter)
        .profile(EncodeProfile::AUDIO_ONLY)
        .or_profile(EncodeProfile::AUDIO_ONLY_COMPATIBLE)
}

pub fn speed_transform(input: &Path, factor: f64) -> Transform {
    reencode(input)
        .video_filter(setpts_filter(factor))
        .audio_filter(atempo_filter(factor))
        .or_profile(EncodeProfile::COMPATIBLE)
}

pub fn reverse_transform(input: &Path) -> Transform {
    reencode(input)
        .video_filter("reverse")
        .audio_filter("areverse")
        .or_profile(EncodeProfile::COMPATIBLE)
}

pub fn invert_transform(input: &Path) -> Transform {
    reencode(input)
        .video_filter("negate")
        .profile(EncodeProfile::VIDEO_ONLY)
        .or_else(
            reencode(input)
                .video_filter(INVERT_FALLBACK_FILTER)
                .profile(EncodeProfile::VIDEO_ONLY_COMPATIBLE),
        )
}

pub fn transform_jitter_transform(input: &Path) -> Transform {
    reencode(input)
        .video_filter(transform_jitter_filter())
        .profile(EncodeProfile::VIDEO_ONLY)
        .or_else(
            reencode(input)
                .video_filter(SHRINK_FILTER)
                .profile(EncodeProfile::VIDEO_ONLY_COMPATIBLE),
        )
}

pub fn image_overlay_transform(
    input: &Path,
    image: &Path,
    x: &Coord,
    y: &Coord,
    opacity: f64,
) -> Transform {
    reencode(input)
        .input(Input::file(image))
        .filter_complex(overlay_graph(x, y, opacity))
        .or_else(
            reencode(input)
                .input(Input::file(image))
                .filter_complex("overlay=0:0")
                .profile(EncodeProfile::COMPATIBLE),
        )
}

pub fn caption_transform(input: &Path, image: &Path) -> Transform {
    reencode(input)
        .input(Input::file(image))
        .filter_complex(format!("overlay={}", CAPTION_POSITION))
        .or_profile(EncodeProfile::COMPATIBLE)
}

pub fn sound_insert_transform(input: &Path, sound: &Path, at: f64) -> Transform {
    reencode(input)
        .input(Input::file(sound).offset(at))
        .filter_complex("[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=2[aout]")
        .map("0:v")
        .map("[aout]")
        .profile(EncodeProfile::AUDIO_ONLY)
        .or_profile(EncodeProfile::AUDIO_ONLY_COMPATIBLE)
}

/// 2009 look. With a watermark the image is laid over the top-left corner; the
/// fallback drops it.
pub fn preset_2009_transform(input: &Path, watermark: Option<&Path>) -> Transform {
    match watermark {
        Some(image) => reencode(input)
            .input(Input::file(image))
            .filter_complex(format!("[0:v]{}[base];[base][1:v]overlay=5:5", PRESET_2009_FILTER))
            .profile(EncodeProfile::VIDEO_ONLY)
            .or_else(
                reencode(input)
                    .video_filter(PRESET_2009_FILTER)
                    .profile(EncodeProfile::VIDEO_ONLY_COMPATIBLE),
            ),
        None => video_step(input, PRESET_2009_FILTER),
    }
}

pub fn preset_2012_transform(input: &Path) -> Transform {
    video_step(input, PRESET_2012_FILTER)
}

pub fn final_transform(input: &Path) -> Transform {
    reencode(input)
        .profile(EncodeProfile::FINAL)
        .or_profile(EncodeProfile::FINAL_COMPATIBLE)
}

pub fn preview_transform(input: &Path, seconds: f64) -> Transform {
    Transform::new(Input::file(input).duration(seconds))
        .video_filter(PREVIEW_FILTER)
        .profile(EncodeProfile::PREVIEW)
        .or_profile(EncodeProfile::PREVIEW_COMPATIBLE)
}

/// Cut `parts` random clips and splice them back together.
pub(crate) fn sentence_mix(state: &mut PipelineState<'_>, mix: &SentenceMix) -> StepResult {
    let source = state.current().to_path_buf();
    let duration = state.duration_or(SENTENCE_MIX_FALLBACK_SECS);
    let parts = mix.effective_parts();
    let clip_len = sentence_clip_secs(duration, parts);
    let mut clips = Vec::with_capacity(parts as usize);
    for _ in 0..parts {
        let start = uniform_start(state.rng(), duration - clip_len);
        let clip = Transform::new(Input::file(&source).seek(start).duration(clip_len))
            .profile(EncodeProfile::STREAM_COPY)
            .or_profile(EncodeProfile::HIGH);
        clips.push(state.run(&clip)?);
    }
    state.concat(&clips).map(Some)
}

pub(crate) fn preset_2009(state: &mut PipelineState<'_>, config: &GenerationConfig) -> StepResult {
    let watermark = match config.effective_watermark() {
        Some(path) => Some(path.to_path_buf()),
        None => state.pick_asset(IMAGE_EXTENSIONS),
    };
    let transform = preset_2009_transform(state.current(), watermark.as_deref());
    state.run(&transform).map(Some)
}

pub(crate) fn preset_2012(state: &mut PipelineState<'_>) -> StepResult {
    let transform = preset_2012_transform(state.current());
    state.run(&transform).map(Some)
}

/// Dispatch one effect. The caller has already applied the enable flag and probability gate.
pub(crate) fn apply(
    kind: EffectKind,
    state: &mut PipelineState<'_>,
    effects: &EffectsConfig,
) -> StepResult {
    let level = effects.level(kind).unwrap_or_default();
    let input = state.current().to_path_buf();
    match kind {
        EffectKind::Reverse => state.run(&reverse_transform(&input)).map(Some),
        EffectKind::Speed => state.run(&speed_transform(&input, level)).map(Some),
        EffectKind::Stutter => stutter(state, level),
        EffectKind::VolumeBoost => state.run(&audio_step(&input, volume_filter(level))).map(Some),
        EffectKind::Chorus => state.run(&audio_step(&input, chorus_filter(level))).map(Some),
        EffectKind::PitchWobble => state.run(&audio_step(&input, pitch_filter(level))).map(Some),
        EffectKind::SpeedJitter => speed_jitter(state, level),
        EffectKind::Invert => state.run(&invert_transform(&input)).map(Some),
        EffectKind::Mirror => state.run(&video_step(&input, "hflip")).map(Some),
        EffectKind::TransformJitter => state.run(&transform_jitter_transform(&input)).map(Some),
        EffectKind::ImageOverlay => {
            let entry = &effects.image_overlay;
            let Some(image) = state.resolve_asset(entry.effective_asset(), IMAGE_EXTENSIONS) else {
                return Ok(None);
            };
            let transform = image_overlay_transform(
                &input,
                &image,
                &entry.x.clone().unwrap_or_default(),
                &entry.y.clone().unwrap_or_default(),
                entry.effective_opacity(),
            );
            state.run(&transform).map(Some)
        }
        EffectKind::OverlaySpam => {
            let entry = &effects.overlay_spam;
            let Some(image) = state.resolve_asset(entry.effective_asset(), IMAGE_EXTENSIONS) else {
                return Ok(None);
            };
            overlay_spam(state, &image, entry.effective_count(4))
        }
        EffectKind::FrameShuffle => frame_shuffle(state, level),
        EffectKind::Caption => {
            let Some(image) =
                state.resolve_asset(effects.caption.effective_asset(), CAPTION_EXTENSIONS)
            else {
                return Ok(None);
            };
            state.run(&caption_transform(&input, &image)).map(Some)
        }
        EffectKind::AudioMix => {
            let entry = &effects.audio_mix;
            let Some(sound) = state.resolve_asset(entry.effective_asset(), SOUND_EXTENSIONS) else {
                return Ok(None);
            };
            audio_mix(state, &sound, entry.effective_count(3))
        }
    }
}

/// Repeat one short segment in place: head, segment × n, tail.
fn stutter(state: &mut PipelineState<'_>, level: f64) -> StepResult {
    let source = state.current().to_path_buf();
    let duration = state.duration_or(STUTTER_FALLBACK_SECS);
    let seg = stutter_segment_secs(level);
    let start = uniform_start(state.rng(), duration - seg);
    let tail_start = start + seg;

    let clip = |input: Input| {
        Transform::new(input)
            .profile(EncodeProfile::HIGH)
            .or_profile(EncodeProfile::COMPATIBLE)
    };

    let mut clips = Vec::new();
    if start >= MIN_CLIP_SECS {
        clips.push(state.run(&clip(Input::file(&source).duration(start)))?);
    }
    let segment = state.run(&clip(Input::file(&source).seek(start).duration(seg)))?;
    clips.extend(std::iter::repeat_n(segment, stutter_repeats(level)));
    if duration - tail_start >= MIN_CLIP_SECS {
        clips.push(state.run(&clip(Input::file(&source).seek(tail_start)))?);
    }
    log::debug!(
        target: "ytp::effects",
        "stutter: {:.3}s segment at {:.3}s repeated {}x",
        seg,
        start,
        stutter_repeats(level)
    );
    state.concat(&clips).map(Some)
}

fn speed_jitter(state: &mut PipelineState<'_>, level: f64) -> StepResult {
    let mut current = state.current().to_path_buf();
    for _ in 0..2 {
        let factor = 0.85 + state.rng().gen_range(0.0..1.0) * (level + 0.3);
        current = state.run(&speed_transform(&current, factor))?;
    }
    Ok(Some(current))
}

fn overlay_spam(state: &mut PipelineState<'_>, image: &Path, count: u32) -> StepResult {
    let duration = state.duration_or(SPAM_FALLBACK_SECS);
    let mut current = state.current().to_path_buf();
    for _ in 0..count {
        let rng = state.rng();
        let start = uniform_start(rng, duration - SPAM_BURST_SECS);
        let x = rng.gen_range(0..=200);
        let y = rng.gen_range(0..=200);
        let end = (start + SPAM_BURST_SECS).min(duration);
        let transform = reencode(&current)
            .input(Input::file(image))
            .filter_complex(spam_burst_graph(x, y, start, end))
            .profile(EncodeProfile::VIDEO_ONLY)
            .or_profile(EncodeProfile::VIDEO_ONLY_COMPATIBLE);
        current = state.run(&transform)?;
    }
    Ok((count > 0).then_some(current))
}

fn audio_mix(state: &mut PipelineState<'_>, sound: &Path, count: u32) -> StepResult {
    let duration = state.duration_or(AUDIO_MIX_FALLBACK_SECS);
    let mut current = state.current().to_path_buf();
    for _ in 0..count {
        let at = uniform_start(state.rng(), duration - SOUND_TAIL_SECS);
        current = state.run(&sound_insert_transform(&current, sound, at))?;
    }
    Ok((count > 0).then_some(current))
}

fn frame_shuffle(state: &mut PipelineState<'_>, level: f64) -> StepResult {
    let source = state.current().to_path_buf();
    let frames_dir = state.temp_dir("-frames")?;
    let pattern = frames_dir.join(FRAME_PATTERN);

    let extract = reencode(&source).profile(EncodeProfile::new(VideoCodec::Auto, AudioCodec::Auto));
    state.run_into(&extract, &pattern)?;

    let mut frames: Vec<PathBuf> = fs::read_dir(&frames_dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("frame_"))
        })
        .collect();
    frames.sort();
    if frames.is_empty() {
        return Ok(None);
    }

    let plan = shuffle_plan(frames.len(), level, state.rng());
    for (i, j) in &plan {
        swap_files(&frames[*i], &frames[*j])?;
    }
    log::debug!(
        target: "ytp::effects",
        "frame_shuffle: {} frames, {} swaps",
        frames.len(),
        plan.len()
    );

    let reassemble = Transform::new(Input::file(&pattern).framerate(SHUFFLE_FPS))
        .input(Input::file(&source))
        .map("0:v")
        .map("1:a?")
        .profile(EncodeProfile::VIDEO_ONLY)
        .or_profile(EncodeProfile::VIDEO_ONLY_COMPATIBLE);
    state.run(&reassemble).map(Some)
}

fn swap_files(a: &Path, b: &Path) -> Result<(), AppError> {
    let mut parked = a.as_os_str().to_owned();
    parked.push(".swap");
    let parked = PathBuf::from(parked);
    fs::rename(a, &parked)?;
    fs::rename(b, a)?;
    fs::rename(&parked, b)?;
    Ok(())
}
