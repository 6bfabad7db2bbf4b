//! Per-run configuration perturbation for batch mode.

use rand::Rng;

use crate::config::{EffectKind, GenerationConfig};

const LEVEL_JITTER: std::ops::RangeInclusive<f64> = 0.7..=1.5;
const MODE_2009_CHANCE: f64 = 0.3;
const MODE_2012_CHANCE: f64 = 0.2;

/// Derive a perturbed copy of `base`: fresh probabilities, jittered levels and
/// occasionally switched-on presets. Enable flags are left as they are.
pub fn randomize<R: Rng + ?Sized>(base: &GenerationConfig, rng: &mut R) -> GenerationConfig {
    let mut config = base.clone();
    for kind in EffectKind::ORDER {
        config
            .effects
            .gate_mut(kind)
            .set_probability(rng.gen_range(0.0..=1.0));
        if let Some(default) = kind.default_level()
            && let Some(entry) = config.effects.leveled_mut(kind)
        {
            let jitter = rng.gen_range(LEVEL_JITTER);
            entry.level = Some(entry.effective_level(default) * jitter);
        }
    }
    if rng.gen_bool(MODE_2009_CHANCE) {
        config.mode_2009 = true;
    }
    if rng.gen_bool(MODE_2012_CHANCE) {
        config.mode_2012 = true;
    }
    config
}
