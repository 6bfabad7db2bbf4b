//! App error type for the generator. Implements Display and Serialize for JSON output.

use crate::ffmpeg::parse_ffmpeg_error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    FfmpegNotFound(String),

    #[error("FFmpeg failed (code {code}): {stderr}")]
    FfmpegFailed { code: i32, stderr: String },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Batch generation requires a valid beta key: {0}")]
    InvalidToken(String),

    #[error("Final encode failed for {0}")]
    EncodeFailed(String),
}

impl AppError {
    pub fn ffmpeg_failed(code: i32, stderr: impl Into<String>) -> Self {
        Self::FfmpegFailed {
            code,
            stderr: stderr.into(),
        }
    }

    /// Short one-line description used when a step failure is logged and swallowed.
    pub fn summary(&self) -> String {
        match self {
            AppError::FfmpegFailed { code, stderr } => {
                parse_ffmpeg_error(stderr, Some(*code)).summary
            }
            _ => self.to_string(),
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            AppError::FfmpegFailed { code, stderr } => {
                let payload = parse_ffmpeg_error(stderr, Some(*code));
                let json =
                    serde_json::json!({ "summary": payload.summary, "detail": payload.detail });
                serializer.serialize_str(&json.to_string())
            }
            _ => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::FfmpegFailed {
            code: -1,
            stderr: s,
        }
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_is_spawn_failure() {
        let e = AppError::from("some error message");
        match &e {
            AppError::FfmpegFailed { code, stderr } => {
                assert_eq!(*code, -1);
                assert_eq!(stderr, "some error message");
            }
            _ => panic!("expected FfmpegFailed"),
        }
    }

    #[test]
    fn summary_uses_exit_code_mapping() {
        let e = AppError::ffmpeg_failed(1, "frame=  120 fps=30 q=28.0");
        assert_eq!(e.summary(), "FFmpeg failed.");
        let e = AppError::ffmpeg_failed(1, "Invalid argument");
        assert_eq!(e.summary(), "FFmpeg failed. Invalid argument");
    }

    #[test]
    fn serializes_ffmpeg_failure_as_json_payload() {
        let e = AppError::ffmpeg_failed(1, "No such filter: 'bogus'");
        let s = serde_json::to_string(&e).unwrap();
        assert!(s.contains("summary"));
        assert!(s.contains("No such filter"));
    }

    #[test]
    fn json_error_becomes_config_error() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Config(_)));
    }
}
