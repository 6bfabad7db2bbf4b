//! Generation configuration.
//!
//! Every recognized effect has its own typed entry; unknown keys are rejected when
//! the JSON is loaded. Optional fields resolve to defaults through `effective_*`
//! accessors so a partially specified entry still behaves sensibly.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Levels beyond this magnitude are rejected; they only make FFmpeg arguments absurd.
pub const MAX_LEVEL: f64 = 1000.0;

const TOP_LEVEL_KEYS: [&str; 6] = [
    "sentence_mix",
    "mode_2009",
    "mode_2012",
    "watermark",
    "assets_dir",
    "effects",
];

/// Effects in the fixed order the pipeline applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Reverse,
    Speed,
    Stutter,
    VolumeBoost,
    Chorus,
    PitchWobble,
    SpeedJitter,
    Invert,
    Mirror,
    TransformJitter,
    ImageOverlay,
    OverlaySpam,
    FrameShuffle,
    Caption,
    AudioMix,
}

impl EffectKind {
    pub const ORDER: [EffectKind; 15] = [
        EffectKind::Reverse,
        EffectKind::Speed,
        EffectKind::Stutter,
        EffectKind::VolumeBoost,
        EffectKind::Chorus,
        EffectKind::PitchWobble,
        EffectKind::SpeedJitter,
        EffectKind::Invert,
        EffectKind::Mirror,
        EffectKind::TransformJitter,
        EffectKind::ImageOverlay,
        EffectKind::OverlaySpam,
        EffectKind::FrameShuffle,
        EffectKind::Caption,
        EffectKind::AudioMix,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Reverse => "reverse",
            EffectKind::Speed => "speed",
            EffectKind::Stutter => "stutter",
            EffectKind::VolumeBoost => "volume_boost",
            EffectKind::Chorus => "chorus",
            EffectKind::PitchWobble => "pitch_wobble",
            EffectKind::SpeedJitter => "speed_jitter",
            EffectKind::Invert => "invert",
            EffectKind::Mirror => "mirror",
            EffectKind::TransformJitter => "transform_jitter",
            EffectKind::ImageOverlay => "image_overlay",
            EffectKind::OverlaySpam => "overlay_spam",
            EffectKind::FrameShuffle => "frame_shuffle",
            EffectKind::Caption => "caption",
            EffectKind::AudioMix => "audio_mix",
        }
    }

    /// Name used by the original desktop tool's config files.
    pub fn legacy_name(self) -> &'static str {
        match self {
            EffectKind::VolumeBoost => "earrape",
            EffectKind::PitchWobble => "vibrato",
            EffectKind::SpeedJitter => "sus",
            EffectKind::TransformJitter => "dance",
            EffectKind::ImageOverlay => "rainbow",
            EffectKind::OverlaySpam => "explosion",
            EffectKind::Caption => "meme",
            EffectKind::AudioMix => "random_sound",
            other => other.name(),
        }
    }

    /// Level used when an entry omits it. None for effects without a level.
    pub fn default_level(self) -> Option<f64> {
        match self {
            EffectKind::Speed => Some(1.2),
            EffectKind::Stutter => Some(2.0),
            EffectKind::VolumeBoost => Some(12.0),
            EffectKind::Chorus => Some(0.6),
            EffectKind::PitchWobble => Some(1.03),
            EffectKind::SpeedJitter => Some(1.1),
            EffectKind::FrameShuffle => Some(8.0),
            _ => None,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EffectKind::ORDER
            .into_iter()
            .find(|k| k.name() == wanted || k.legacy_name() == wanted)
            .ok_or_else(|| format!("unknown effect '{}'", s))
    }
}

/// Overlay coordinate: a pixel offset or an FFmpeg overlay expression such as `(main_w-overlay_w)/2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Pixels(i64),
    Expr(String),
}

impl Default for Coord {
    fn default() -> Self {
        Coord::Pixels(0)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coord::Pixels(px) => write!(f, "{}", px),
            Coord::Expr(expr) => f.write_str(expr),
        }
    }
}

/// Enable flag plus probability gate, shared by every effect entry.
pub trait Gated {
    fn enabled(&self) -> bool;
    /// Probability in [0, 1]; an absent value means "always".
    fn probability(&self) -> f64;
    fn set_enabled(&mut self, enabled: bool);
    fn set_probability(&mut self, probability: f64);
    fn raw_probability(&self) -> Option<f64>;
}

macro_rules! impl_gated {
    ($($ty:ty),+ $(,)?) => {
        $(impl Gated for $ty {
            fn enabled(&self) -> bool {
                self.enabled
            }

            fn probability(&self) -> f64 {
                self.probability.unwrap_or(1.0).clamp(0.0, 1.0)
            }

            fn set_enabled(&mut self, enabled: bool) {
                self.enabled = enabled;
            }

            fn set_probability(&mut self, probability: f64) {
                self.probability = Some(probability.clamp(0.0, 1.0));
            }

            fn raw_probability(&self) -> Option<f64> {
                self.probability
            }
        })+
    };
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Toggle {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "prob", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl Toggle {
    pub fn with_probability(probability: f64) -> Self {
        Self {
            enabled: false,
            probability: Some(probability),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Leveled {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "prob", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
}

impl Leveled {
    pub fn new(probability: f64, level: f64) -> Self {
        Self {
            enabled: false,
            probability: Some(probability),
            level: Some(level),
        }
    }

    pub fn effective_level(&self, default: f64) -> f64 {
        self.level.filter(|l| l.is_finite()).unwrap_or(default)
    }
}

/// Repeated insertion of an asset (overlay bursts, sound drops).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Repeated {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "prob", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl Repeated {
    pub fn new(probability: f64, count: u32) -> Self {
        Self {
            enabled: false,
            probability: Some(probability),
            asset: None,
            count: Some(count),
        }
    }

    pub fn effective_asset(&self) -> Option<&Path> {
        non_empty(&self.asset)
    }

    pub fn effective_count(&self, default: u32) -> u32 {
        self.count.unwrap_or(default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overlay {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "prob", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Overlay {
    pub fn effective_asset(&self) -> Option<&Path> {
        non_empty(&self.asset)
    }

    pub fn effective_opacity(&self) -> f64 {
        self.opacity.unwrap_or(0.9).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Caption {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "prob", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
}

impl Caption {
    pub fn effective_asset(&self) -> Option<&Path> {
        non_empty(&self.asset)
    }
}

impl_gated!(Toggle, Leveled, Repeated, Overlay, Caption);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SentenceMix {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<u32>,
}

impl Default for SentenceMix {
    fn default() -> Self {
        Self {
            enabled: false,
            parts: Some(6),
        }
    }
}

impl SentenceMix {
    pub fn effective_parts(&self) -> u32 {
        self.parts.unwrap_or(6).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsConfig {
    pub reverse: Toggle,
    pub speed: Leveled,
    pub stutter: Leveled,
    #[serde(alias = "earrape")]
    pub volume_boost: Leveled,
    pub chorus: Leveled,
    #[serde(alias = "vibrato")]
    pub pitch_wobble: Leveled,
    #[serde(alias = "sus")]
    pub speed_jitter: Leveled,
    pub invert: Toggle,
    pub mirror: Toggle,
    #[serde(alias = "dance")]
    pub transform_jitter: Toggle,
    #[serde(alias = "rainbow")]
    pub image_overlay: Overlay,
    #[serde(alias = "explosion")]
    pub overlay_spam: Repeated,
    pub frame_shuffle: Leveled,
    #[serde(alias = "meme")]
    pub caption: Caption,
    #[serde(alias = "random_sound")]
    pub audio_mix: Repeated,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            reverse: Toggle::with_probability(1.0),
            speed: Leveled::new(1.0, 1.2),
            stutter: Leveled::new(0.8, 2.0),
            volume_boost: Leveled::new(0.5, 12.0),
            chorus: Leveled::new(0.6, 0.6),
            pitch_wobble: Leveled::new(0.6, 1.03),
            speed_jitter: Leveled::new(0.5, 1.1),
            invert: Toggle::with_probability(0.5),
            mirror: Toggle::with_probability(0.5),
            transform_jitter: Toggle::with_probability(0.4),
            image_overlay: Overlay {
                probability: Some(0.6),
                opacity: Some(0.9),
                ..Overlay::default()
            },
            overlay_spam: Repeated::new(0.5, 4),
            frame_shuffle: Leveled::new(0.3, 8.0),
            caption: Caption {
                probability: Some(0.5),
                ..Caption::default()
            },
            audio_mix: Repeated::new(0.7, 3),
        }
    }
}

impl EffectsConfig {
    pub fn gate(&self, kind: EffectKind) -> &dyn Gated {
        match kind {
            EffectKind::Reverse => &self.reverse,
            EffectKind::Speed => &self.speed,
            EffectKind::Stutter => &self.stutter,
            EffectKind::VolumeBoost => &self.volume_boost,
            EffectKind::Chorus => &self.chorus,
            EffectKind::PitchWobble => &self.pitch_wobble,
            EffectKind::SpeedJitter => &self.speed_jitter,
            EffectKind::Invert => &self.invert,
            EffectKind::Mirror => &self.mirror,
            EffectKind::TransformJitter => &self.transform_jitter,
            EffectKind::ImageOverlay => &self.image_overlay,
            EffectKind::OverlaySpam => &self.overlay_spam,
            EffectKind::FrameShuffle => &self.frame_shuffle,
            EffectKind::Caption => &self.caption,
            EffectKind::AudioMix => &self.audio_mix,
        }
    }

    pub fn gate_mut(&mut self, kind: EffectKind) -> &mut dyn Gated {
        match kind {
            EffectKind::Reverse => &mut self.reverse,
            EffectKind::Speed => &mut self.speed,
            EffectKind::Stutter => &mut self.stutter,
            EffectKind::VolumeBoost => &mut self.volume_boost,
            EffectKind::Chorus => &mut self.chorus,
            EffectKind::PitchWobble => &mut self.pitch_wobble,
            EffectKind::SpeedJitter => &mut self.speed_jitter,
            EffectKind::Invert => &mut self.invert,
            EffectKind::Mirror => &mut self.mirror,
            EffectKind::TransformJitter => &mut self.transform_jitter,
            EffectKind::ImageOverlay => &mut self.image_overlay,
            EffectKind::OverlaySpam => &mut self.overlay_spam,
            EffectKind::FrameShuffle => &mut self.frame_shuffle,
            EffectKind::Caption => &mut self.caption,
            EffectKind::AudioMix => &mut self.audio_mix,
        }
    }

    /// The leveled entry for `kind`, if that effect takes a level.
    pub fn leveled(&self, kind: EffectKind) -> Option<&Leveled> {
        match kind {
            EffectKind::Speed => Some(&self.speed),
            EffectKind::Stutter => Some(&self.stutter),
            EffectKind::VolumeBoost => Some(&self.volume_boost),
            EffectKind::Chorus => Some(&self.chorus),
            EffectKind::PitchWobble => Some(&self.pitch_wobble),
            EffectKind::SpeedJitter => Some(&self.speed_jitter),
            EffectKind::FrameShuffle => Some(&self.frame_shuffle),
            _ => None,
        }
    }

    pub fn leveled_mut(&mut self, kind: EffectKind) -> Option<&mut Leveled> {
        match kind {
            EffectKind::Speed => Some(&mut self.speed),
            EffectKind::Stutter => Some(&mut self.stutter),
            EffectKind::VolumeBoost => Some(&mut self.volume_boost),
            EffectKind::Chorus => Some(&mut self.chorus),
            EffectKind::PitchWobble => Some(&mut self.pitch_wobble),
            EffectKind::SpeedJitter => Some(&mut self.speed_jitter),
            EffectKind::FrameShuffle => Some(&mut self.frame_shuffle),
            _ => None,
        }
    }

    /// Effective level for a leveled effect (configured value or the effect default).
    pub fn level(&self, kind: EffectKind) -> Option<f64> {
        let default = kind.default_level()?;
        Some(
            self.leveled(kind)
                .map_or(default, |entry| entry.effective_level(default)),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    pub sentence_mix: SentenceMix,
    /// Low-res, oversaturated look with an optional watermark in the corner.
    pub mode_2009: bool,
    /// Higher-contrast, slightly desaturated look.
    pub mode_2012: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,
    pub effects: EffectsConfig,
}

impl GenerationConfig {
    /// Parse and validate. Effect entries may also sit at the top level (the flat
    /// layout), with the watermark given as `assets.2009_ad`.
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let mut value: Value = serde_json::from_str(json)?;
        if let Value::Object(map) = &mut value {
            lift_flat_layout(map)?;
        }
        let config: GenerationConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for kind in EffectKind::ORDER {
            if let Some(p) = self.effects.gate(kind).raw_probability()
                && !(0.0..=1.0).contains(&p)
            {
                return Err(AppError::Config(format!(
                    "{}.probability must be within [0, 1], got {}",
                    kind, p
                )));
            }
            if let Some(level) = self.effects.leveled(kind).and_then(|e| e.level) {
                if !level.is_finite() {
                    return Err(AppError::Config(format!("{}.level must be finite", kind)));
                }
                if level.abs() > MAX_LEVEL {
                    return Err(AppError::Config(format!(
                        "{}.level must be within [-{}, {}], got {}",
                        kind, MAX_LEVEL, MAX_LEVEL, level
                    )));
                }
            }
        }
        if let Some(opacity) = self.effects.image_overlay.opacity
            && !(0.0..=1.0).contains(&opacity)
        {
            return Err(AppError::Config(format!(
                "image_overlay.opacity must be within [0, 1], got {}",
                opacity
            )));
        }
        Ok(())
    }

    pub fn enable(&mut self, kind: EffectKind) {
        self.effects.gate_mut(kind).set_enabled(true);
    }

    pub fn enabled_effects(&self) -> Vec<EffectKind> {
        EffectKind::ORDER
            .into_iter()
            .filter(|k| self.effects.gate(*k).enabled())
            .collect()
    }

    pub fn effective_watermark(&self) -> Option<&Path> {
        non_empty(&self.watermark)
    }
}

/// Move top-level effect entries under `effects` and `assets.2009_ad` to `watermark`.
fn lift_flat_layout(map: &mut Map<String, Value>) -> Result<(), AppError> {
    if let Some(assets) = map.remove("assets") {
        let Value::Object(mut assets) = assets else {
            return Err(AppError::Config("assets must be an object".into()));
        };
        if let Some(ad) = assets.remove("2009_ad")
            && !map.contains_key("watermark")
        {
            map.insert("watermark".into(), ad);
        }
        if let Some(key) = assets.keys().next() {
            return Err(AppError::Config(format!("unknown asset key `{}`", key)));
        }
    }
    let flat: Vec<String> = map
        .keys()
        .filter(|k| !TOP_LEVEL_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    if flat.is_empty() {
        return Ok(());
    }
    let lifted: Vec<(String, Value)> = flat
        .into_iter()
        .filter_map(|key| map.remove(&key).map(|entry| (key, entry)))
        .collect();
    let effects = map
        .entry("effects")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(effects) = effects else {
        return Err(AppError::Config("effects must be an object".into()));
    };
    for (key, entry) in lifted {
        if effects.contains_key(&key) {
            return Err(AppError::Config(format!(
                "`{}` is given both at the top level and under effects",
                key
            )));
        }
        effects.insert(key, entry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_disabled() {
        let config = GenerationConfig::default();
        assert!(config.enabled_effects().is_empty());
        assert!(!config.sentence_mix.enabled);
        assert!(!config.mode_2009 && !config.mode_2012);
    }

    #[test]
    fn unknown_effect_key_rejected() {
        let err = GenerationConfig::from_json(r#"{"effects": {"wobble": {"enabled": true}}}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn unknown_param_rejected() {
        let err =
            GenerationConfig::from_json(r#"{"effects": {"reverse": {"enabled": true, "level": 2}}}"#)
                .unwrap_err();
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn legacy_names_accepted() {
        let config = GenerationConfig::from_json(
            r#"{"effects": {
                "earrape": {"enabled": true, "prob": 0.5, "level": 12.0},
                "meme": {"enabled": true, "image": "/tmp/meme.png"},
                "random_sound": {"enabled": true, "asset": "", "count": 3}
            }}"#,
        )
        .unwrap();
        assert!(config.effects.volume_boost.enabled);
        assert_eq!(config.effects.volume_boost.probability(), 0.5);
        assert_eq!(
            config.effects.caption.effective_asset(),
            Some(Path::new("/tmp/meme.png"))
        );
        assert_eq!(config.effects.audio_mix.effective_asset(), None);
    }

    #[test]
    fn partial_entry_uses_effect_defaults() {
        let config =
            GenerationConfig::from_json(r#"{"effects": {"speed": {"enabled": true}}}"#).unwrap();
        assert_eq!(config.effects.gate(EffectKind::Speed).probability(), 1.0);
        assert_eq!(config.effects.level(EffectKind::Speed), Some(1.2));
        // untouched entries keep their defaults
        assert_eq!(config.effects.stutter.probability, Some(0.8));
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let err = GenerationConfig::from_json(
            r#"{"effects": {"mirror": {"enabled": true, "probability": 1.5}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mirror.probability"));
    }

    #[test]
    fn overlay_coordinates_accept_numbers_and_expressions() {
        let config = GenerationConfig::from_json(
            r#"{"effects": {"image_overlay": {"enabled": true, "x": 10, "y": "(main_h-overlay_h)/2"}}}"#,
        )
        .unwrap();
        let overlay = &config.effects.image_overlay;
        assert_eq!(overlay.x.as_ref().unwrap().to_string(), "10");
        assert_eq!(overlay.y.as_ref().unwrap().to_string(), "(main_h-overlay_h)/2");
        assert_eq!(overlay.effective_opacity(), 0.9);
    }

    #[test]
    fn effect_kind_parses_names_and_legacy_names() {
        assert_eq!("volume-boost".parse::<EffectKind>(), Ok(EffectKind::VolumeBoost));
        assert_eq!("sus".parse::<EffectKind>(), Ok(EffectKind::SpeedJitter));
        assert!("nope".parse::<EffectKind>().is_err());
    }

    #[test]
    fn oversized_level_rejected() {
        let err = GenerationConfig::from_json(
            r#"{"effects": {"stutter": {"enabled": true, "probability": 1.0, "level": 1e18}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("stutter.level"));
        assert!(
            GenerationConfig::from_json(r#"{"effects": {"volume_boost": {"level": -20}}}"#).is_ok()
        );
    }

    #[test]
    fn flat_layout_with_legacy_names() {
        let config = GenerationConfig::from_json(
            r#"{
                "mode_2009": true,
                "reverse": {"enabled": true},
                "earrape": {"enabled": true, "prob": 0.5, "level": 12},
                "assets": {"2009_ad": "ads/banner.png"}
            }"#,
        )
        .unwrap();
        assert!(config.mode_2009);
        assert!(config.effects.reverse.enabled);
        assert!(config.effects.volume_boost.enabled);
        assert_eq!(config.effects.volume_boost.level, Some(12.0));
        assert_eq!(config.watermark, Some(PathBuf::from("ads/banner.png")));
    }

    #[test]
    fn flat_layout_still_rejects_unknown_keys() {
        assert!(GenerationConfig::from_json(r#"{"wobble": {"enabled": true}}"#).is_err());
        assert!(GenerationConfig::from_json(r#"{"assets": {"intro": "a.png"}}"#).is_err());
        assert!(
            GenerationConfig::from_json(
                r#"{"reverse": {"enabled": true}, "effects": {"reverse": {"enabled": false}}}"#
            )
            .is_err()
        );
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let mut config = GenerationConfig::default();
        config.enable(EffectKind::Stutter);
        config.mode_2012 = true;
        let json = config.to_json_pretty().unwrap();
        assert_eq!(GenerationConfig::from_json(&json).unwrap(), config);
    }
}
