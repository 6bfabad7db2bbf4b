//! Declarative FFmpeg invocations.
//!
//! Effect handlers describe what they want as a [`Transform`]; the pipeline
//! allocates the output path and turns it into an argument list here.

use std::path::{Path, PathBuf};

use super::path_to_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Let FFmpeg pick the container default.
    Auto,
    Copy,
    /// libx264, veryfast preset, yuv420p for player compatibility.
    H264,
    /// libx264 ultrafast, for throwaway previews.
    H264Draft,
    /// mpeg4 with a fixed quantizer; available in virtually every build.
    Mpeg4 { qscale: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Auto,
    Copy,
    Aac,
    Mp3,
}

/// Codec choice for one invocation. A fallback attempt swaps in a more compatible profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeProfile {
    pub video: VideoCodec,
    pub audio: AudioCodec,
    pub audio_kbps: Option<u32>,
}

impl EncodeProfile {
    /// Effect steps that re-encode both streams.
    pub const HIGH: Self = Self::new(VideoCodec::H264, AudioCodec::Aac);
    pub const COMPATIBLE: Self = Self::new(VideoCodec::Mpeg4 { qscale: 6 }, AudioCodec::Mp3);
    /// Steps that only touch the picture.
    pub const VIDEO_ONLY: Self = Self::new(VideoCodec::H264, AudioCodec::Copy);
    pub const VIDEO_ONLY_COMPATIBLE: Self =
        Self::new(VideoCodec::Mpeg4 { qscale: 6 }, AudioCodec::Copy);
    /// Steps that only touch the sound.
    pub const AUDIO_ONLY: Self = Self::new(VideoCodec::Copy, AudioCodec::Aac);
    pub const AUDIO_ONLY_COMPATIBLE: Self = Self::new(VideoCodec::Copy, AudioCodec::Mp3);
    pub const STREAM_COPY: Self = Self::new(VideoCodec::Copy, AudioCodec::Copy);
    /// Final output encode.
    pub const FINAL: Self = Self {
        video: VideoCodec::H264,
        audio: AudioCodec::Aac,
        audio_kbps: Some(192),
    };
    pub const FINAL_COMPATIBLE: Self = Self {
        video: VideoCodec::Mpeg4 { qscale: 5 },
        audio: AudioCodec::Mp3,
        audio_kbps: Some(192),
    };
    pub const PREVIEW: Self = Self::new(VideoCodec::H264Draft, AudioCodec::Auto);
    pub const PREVIEW_COMPATIBLE: Self =
        Self::new(VideoCodec::Mpeg4 { qscale: 6 }, AudioCodec::Auto);

    pub const fn new(video: VideoCodec, audio: AudioCodec) -> Self {
        Self {
            video,
            audio,
            audio_kbps: None,
        }
    }

    pub fn args(&self) -> Vec<String> {
        if self.video == VideoCodec::Copy && self.audio == AudioCodec::Copy {
            return vec!["-c".to_string(), "copy".to_string()];
        }
        let mut args = Vec::new();
        match self.video {
            VideoCodec::Auto => {}
            VideoCodec::Copy => args.extend(["-c:v".to_string(), "copy".to_string()]),
            VideoCodec::H264 => args.extend([
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "veryfast".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
            ]),
            VideoCodec::H264Draft => args.extend([
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "ultrafast".to_string(),
            ]),
            VideoCodec::Mpeg4 { qscale } => args.extend([
                "-c:v".to_string(),
                "mpeg4".to_string(),
                "-qscale:v".to_string(),
                qscale.to_string(),
            ]),
        }
        let audio = match self.audio {
            AudioCodec::Auto => None,
            AudioCodec::Copy => Some("copy"),
            AudioCodec::Aac => Some("aac"),
            AudioCodec::Mp3 => Some("libmp3lame"),
        };
        if let Some(codec) = audio {
            args.extend(["-c:a".to_string(), codec.to_string()]);
            if let Some(kbps) = self.audio_kbps
                && codec != "copy"
            {
                args.extend(["-b:a".to_string(), format!("{}k", kbps)]);
            }
        }
        args
    }
}

/// One `-i` input with the options that must precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub path: PathBuf,
    pub seek: Option<f64>,
    pub duration: Option<f64>,
    pub offset: Option<f64>,
    pub framerate: Option<u32>,
    pub concat_list: bool,
}

impl Input {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seek: None,
            duration: None,
            offset: None,
            framerate: None,
            concat_list: false,
        }
    }

    /// A concat-demuxer list file (`-f concat -safe 0`).
    pub fn concat(list: impl Into<PathBuf>) -> Self {
        Self {
            concat_list: true,
            ..Self::file(list)
        }
    }

    pub fn seek(mut self, secs: f64) -> Self {
        self.seek = Some(secs);
        self
    }

    pub fn duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Delay this input's timestamps (`-itsoffset`).
    pub fn offset(mut self, secs: f64) -> Self {
        self.offset = Some(secs);
        self
    }

    pub fn framerate(mut self, fps: u32) -> Self {
        self.framerate = Some(fps);
        self
    }

    fn push_args(&self, args: &mut Vec<String>) {
        if self.concat_list {
            args.extend(["-f", "concat", "-safe", "0"].map(String::from));
        }
        if let Some(fps) = self.framerate {
            args.extend(["-framerate".to_string(), fps.to_string()]);
        }
        if let Some(seek) = self.seek {
            args.extend(["-ss".to_string(), format!("{:.3}", seek)]);
        }
        if let Some(duration) = self.duration {
            args.extend(["-t".to_string(), format!("{:.3}", duration)]);
        }
        if let Some(offset) = self.offset {
            args.extend(["-itsoffset".to_string(), format!("{:.3}", offset)]);
        }
        args.extend(["-i".to_string(), path_to_string(&self.path)]);
    }
}

/// A single FFmpeg invocation minus its output path, with an optional fallback attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub inputs: Vec<Input>,
    pub video_filter: Option<String>,
    pub audio_filter: Option<String>,
    pub filter_complex: Option<String>,
    pub maps: Vec<String>,
    pub profile: EncodeProfile,
    pub fallback: Option<Box<Transform>>,
}

impl Transform {
    pub fn new(input: Input) -> Self {
        Self {
            inputs: vec![input],
            video_filter: None,
            audio_filter: None,
            filter_complex: None,
            maps: Vec::new(),
            profile: EncodeProfile::HIGH,
            fallback: None,
        }
    }

    pub fn input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn video_filter(mut self, filter: impl Into<String>) -> Self {
        self.video_filter = Some(filter.into());
        self
    }

    pub fn audio_filter(mut self, filter: impl Into<String>) -> Self {
        self.audio_filter = Some(filter.into());
        self
    }

    pub fn filter_complex(mut self, graph: impl Into<String>) -> Self {
        self.filter_complex = Some(graph.into());
        self
    }

    pub fn map(mut self, stream: impl Into<String>) -> Self {
        self.maps.push(stream.into());
        self
    }

    pub fn profile(mut self, profile: EncodeProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Try `fallback` when this invocation fails.
    pub fn or_else(mut self, fallback: Transform) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Retry the same invocation with another codec profile when it fails.
    pub fn or_profile(self, profile: EncodeProfile) -> Self {
        let mut retry = self.clone();
        retry.fallback = None;
        retry.profile = profile;
        self.or_else(retry)
    }

    /// The attempts in order: this transform, then its fallback chain.
    pub fn attempts(&self) -> Vec<&Transform> {
        let mut out = vec![self];
        let mut cur = self;
        while let Some(next) = cur.fallback.as_deref() {
            out.push(next);
            cur = next;
        }
        out
    }

    pub fn build_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string(), "-nostdin".to_string(), "-y".to_string()];
        for input in &self.inputs {
            input.push_args(&mut args);
        }
        if let Some(ref vf) = self.video_filter {
            args.extend(["-vf".to_string(), vf.clone()]);
        }
        if let Some(ref af) = self.audio_filter {
            args.extend(["-af".to_string(), af.clone()]);
        }
        if let Some(ref graph) = self.filter_complex {
            args.extend(["-filter_complex".to_string(), graph.clone()]);
        }
        for map in &self.maps {
            args.extend(["-map".to_string(), map.clone()]);
        }
        args.extend(self.profile.args());
        args.push(path_to_string(output));
        args
    }
}

/// Render args one per line for `--dry-run` style display, pairing flags with values.
pub fn format_args_for_display(args: &[String]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        let takes_value = arg.starts_with('-')
            && iter
                .peek()
                .is_some_and(|next| !next.starts_with('-') || next.parse::<f64>().is_ok());
        if takes_value {
            if let Some(value) = iter.next() {
                lines.push(format!("{} {}", arg, quote_if_needed(value)));
                continue;
            }
        }
        lines.push(quote_if_needed(arg));
    }
    lines.join(" \\\n  ")
}

fn quote_if_needed(s: &str) -> String {
    if s.contains([' ', ';', '[', '\'', '|']) {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_copy_uses_short_form() {
        assert_eq!(EncodeProfile::STREAM_COPY.args(), vec!["-c", "copy"]);
    }

    #[test]
    fn final_profile_sets_audio_bitrate() {
        let args = EncodeProfile::FINAL.args();
        assert_eq!(
            args,
            vec![
                "-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p", "-c:a", "aac",
                "-b:a", "192k"
            ]
        );
        let compat = EncodeProfile::FINAL_COMPATIBLE.args();
        assert_eq!(
            compat,
            vec!["-c:v", "mpeg4", "-qscale:v", "5", "-c:a", "libmp3lame", "-b:a", "192k"]
        );
    }

    #[test]
    fn input_options_precede_their_path() {
        let t = Transform::new(Input::file("/in.mp4").seek(1.5).duration(0.2))
            .profile(EncodeProfile::STREAM_COPY);
        let args = t.build_args(Path::new("/out.mp4"));
        assert_eq!(
            args,
            vec![
                "-hide_banner", "-nostdin", "-y", "-ss", "1.500", "-t", "0.200", "-i", "/in.mp4",
                "-c", "copy", "/out.mp4"
            ]
        );
    }

    #[test]
    fn concat_input_uses_demuxer() {
        let t = Transform::new(Input::concat("/list.txt")).profile(EncodeProfile::STREAM_COPY);
        let args = t.build_args(Path::new("/out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i /list.txt"));
    }

    #[test]
    fn or_profile_adds_single_retry() {
        let t = Transform::new(Input::file("/in.mp4"))
            .video_filter("hflip")
            .or_profile(EncodeProfile::COMPATIBLE);
        let attempts = t.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].video_filter.as_deref(), Some("hflip"));
        assert_eq!(attempts[1].profile, EncodeProfile::COMPATIBLE);
        assert!(attempts[1].fallback.is_none());
    }

    #[test]
    fn filters_and_maps_in_order() {
        let t = Transform::new(Input::file("/in.mp4"))
            .input(Input::file("/img.png"))
            .filter_complex("[0:v][1:v]overlay=0:0[vout]")
            .map("[vout]")
            .map("0:a?")
            .profile(EncodeProfile::VIDEO_ONLY);
        let args = t.build_args(Path::new("/out.mp4"));
        let fc = args.iter().position(|a| a == "-filter_complex").unwrap();
        let first_map = args.iter().position(|a| a == "-map").unwrap();
        assert!(fc < first_map);
        assert_eq!(args[first_map + 1], "[vout]");
        assert_eq!(args[first_map + 3], "0:a?");
    }

    #[test]
    fn display_pairs_flags_with_values() {
        let args: Vec<String> = ["-y", "-i", "in.mp4", "-vf", "scale=640:-2", "out.mp4"]
            .map(String::from)
            .to_vec();
        let shown = format_args_for_display(&args);
        assert_eq!(shown, "-y \\\n  -i in.mp4 \\\n  -vf scale=640:-2 \\\n  out.mp4");
    }
}
