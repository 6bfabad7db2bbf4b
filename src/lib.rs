pub mod assets;
pub mod config;
mod effects;
pub mod error;
pub mod ffmpeg;
mod pipeline;
pub mod randomize;
#[cfg(any(test, feature = "integration-test-api"))]
pub mod test_support;
pub mod token;

pub use config::{EffectKind, GenerationConfig};
pub use effects::{PRESET_2009_FILTER, PRESET_2012_FILTER, atempo_chain};
pub use pipeline::{DEFAULT_WORK_DIR, Engine, EngineOptions, PREVIEW_SECONDS, STALE_ARTIFACT_AGE};
