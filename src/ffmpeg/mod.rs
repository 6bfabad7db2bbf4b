mod builder;
pub mod discovery;
mod error;
pub mod probe;
mod runner;
mod temp;
mod verify;

pub use builder::{
    AudioCodec, EncodeProfile, Input, Transform, VideoCodec, format_args_for_display,
};
pub use error::{FfmpegErrorPayload, parse_ffmpeg_error};
pub use runner::{DryRunRunner, FfmpegRunner, MediaRunner, play_blocking};
pub use temp::{
    TEMP_PREFIX, TempFileManager, cleanup_old_temp_files, concat_list, concat_list_line,
    remove_artifact,
};
pub use verify::verify_video;

/// Path to string for FFmpeg args or logging.
pub fn path_to_string(path: &(impl AsRef<std::path::Path> + ?Sized)) -> String {
    path.as_ref().to_string_lossy().to_string()
}
