// Common data models for the download flow

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::DownloadError;

lazy_static::lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(
        r"(?:v=|/(?:shorts|embed|live|v|e)/|youtu\.be/)([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)"
    ).unwrap();
    static ref BARE_ID_RE: Regex = Regex::new(r"^[0-9A-Za-z_-]{11}$").unwrap();
}

/// A remote video, identified by the URL the user gave and its extracted id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    url: String,
    id: String,
}

impl VideoRef {
    /// Parse a URL (or a bare 11-character id) into a video reference
    pub fn parse(input: &str) -> Result<Self, DownloadError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DownloadError::InvalidInput("empty URL".to_string()));
        }

        if BARE_ID_RE.is_match(trimmed) {
            return Ok(Self {
                url: format!("https://www.youtube.com/watch?v={}", trimmed),
                id: trimmed.to_string(),
            });
        }

        let lower = trimmed.to_lowercase();
        let has_scheme = lower.starts_with("http://") || lower.starts_with("https://");
        let is_youtube_host = lower.contains("youtube.com/")
            || lower.contains("youtu.be/")
            || lower.contains("youtube-nocookie.com/");
        if !has_scheme && !is_youtube_host {
            return Err(DownloadError::InvalidInput(format!("not a URL: {}", trimmed)));
        }

        let id = VIDEO_ID_RE
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                DownloadError::InvalidInput(format!("no video id in URL: {}", trimmed))
            })?;

        let url = if has_scheme {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        Ok(Self { url, id })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical watch URL handed to the video service
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// What a stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Video and audio muxed into one file
    Muxed,
    /// Audio only
    AudioOnly,
}

/// One fetchable variant of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Opaque handle the video service uses to fetch this variant
    pub format_id: String,
    pub kind: MediaKind,
    /// Resolution label such as "720p"; `None` for audio-only streams
    pub resolution: Option<String>,
    /// Container / file extension (mp4, webm, m4a)
    pub ext: String,
    pub height: Option<u32>,
    /// Audio bitrate in kbps
    pub abr: Option<f32>,
    pub filesize: Option<u64>,
}

impl StreamDescriptor {
    pub fn is_audio_only(&self) -> bool {
        self.kind == MediaKind::AudioOnly
    }
}

/// Requested output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mp3,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Mp3)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp4" | "video" => Ok(Self::Mp4),
            "mp3" | "audio" => Ok(Self::Mp3),
            other => Err(DownloadError::InvalidInput(format!(
                "unknown output format '{}', expected mp4 or mp3",
                other
            ))),
        }
    }
}

/// Requested resolution for video output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionPreference {
    #[default]
    Highest,
    Exact(String),
}

impl FromStr for ResolutionPreference {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DownloadError::InvalidInput("empty resolution".to_string()));
        }
        match trimmed.to_lowercase().as_str() {
            "highest" | "best" => Ok(Self::Highest),
            _ => Ok(Self::Exact(trimmed.to_string())),
        }
    }
}

impl fmt::Display for ResolutionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Highest => write!(f, "highest"),
            Self::Exact(label) => write!(f, "{}", label),
        }
    }
}

/// A user's download choice
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub video: VideoRef,
    pub format: OutputFormat,
    /// Ignored for audio output
    pub resolution: ResolutionPreference,
    pub dest_dir: PathBuf,
}

/// Video information reported by the video service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub thumbnail: String,
    pub streams: Vec<StreamDescriptor>,
}

impl VideoInfo {
    /// Duration as m:ss
    pub fn duration(&self) -> String {
        format!("{}:{:02}", self.duration_seconds / 60, self.duration_seconds % 60)
    }
}

/// Download progress information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}
