// FormatSelector - picks exactly one stream for a request
//
// Handles:
// - Audio-only selection (m4a preferred, then highest bitrate)
// - Exact resolution match (no fallback to a nearby resolution)
// - Highest resolution detection
// - Quality options with size estimates for display

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::models::{MediaKind, OutputFormat, ResolutionPreference, StreamDescriptor};

/// Container the video path selects from
const VIDEO_CONTAINER: &str = "mp4";

/// Quality option for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityOption {
    /// Display label (e.g., "720p (mp4, 48 MB)")
    pub label: String,

    /// Value passed back as the resolution preference ("720p")
    pub value: String,

    /// Estimated file size (e.g., "48 MB")
    pub estimated_size: Option<String>,
}

pub struct FormatSelector;

impl FormatSelector {
    /// Select the single stream satisfying `format` and `resolution`
    pub fn select<'a>(
        streams: &'a [StreamDescriptor],
        format: OutputFormat,
        resolution: &ResolutionPreference,
    ) -> Result<&'a StreamDescriptor, DownloadError> {
        if format.is_audio() {
            return Self::find_best_audio(streams)
                .ok_or_else(|| DownloadError::NotFound("no audio-only stream available".to_string()));
        }

        match resolution {
            ResolutionPreference::Exact(label) => Self::video_streams(streams)
                .find(|s| s.resolution.as_deref() == Some(label.as_str()))
                .ok_or_else(|| {
                    DownloadError::NotFound(format!("no {} stream at resolution {}", VIDEO_CONTAINER, label))
                }),
            ResolutionPreference::Highest => Self::find_highest_video(streams)
                .ok_or_else(|| DownloadError::NotFound("no video streams available for download".to_string())),
        }
    }

    /// Distinct resolution labels available for `format`, highest first
    pub fn available_resolutions(streams: &[StreamDescriptor], format: OutputFormat) -> Vec<String> {
        if format.is_audio() {
            return Vec::new();
        }

        let mut video: Vec<&StreamDescriptor> = Self::video_streams(streams).collect();
        video.sort_by(|a, b| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)));

        let mut labels: Vec<String> = Vec::new();
        for label in video.into_iter().filter_map(|s| s.resolution.clone()) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    /// Build display options for every selectable video resolution plus audio
    pub fn quality_options(streams: &[StreamDescriptor]) -> Vec<QualityOption> {
        let mut options: Vec<QualityOption> = Self::available_resolutions(streams, OutputFormat::Mp4)
            .into_iter()
            .map(|label| {
                let size = Self::video_streams(streams)
                    .find(|s| s.resolution.as_deref() == Some(label.as_str()))
                    .and_then(|s| Self::format_size(s.filesize));
                let display = match &size {
                    Some(size) => format!("{} ({}, {})", label, VIDEO_CONTAINER, size),
                    None => format!("{} ({})", label, VIDEO_CONTAINER),
                };
                QualityOption {
                    label: display,
                    value: label,
                    estimated_size: size,
                }
            })
            .collect();

        if let Some(audio) = Self::find_best_audio(streams) {
            let size = Self::format_size(audio.filesize);
            options.push(QualityOption {
                label: match &size {
                    Some(size) => format!("Audio Only (mp3, {})", size),
                    None => "Audio Only (mp3)".to_string(),
                },
                value: "audio".to_string(),
                estimated_size: size,
            });
        }

        options
    }

    fn video_streams(streams: &[StreamDescriptor]) -> impl Iterator<Item = &StreamDescriptor> {
        streams
            .iter()
            .filter(|s| s.kind == MediaKind::Muxed && s.ext == VIDEO_CONTAINER)
    }

    /// Highest muxed video stream; the first one wins a tie
    fn find_highest_video(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
        Self::video_streams(streams).fold(None::<&StreamDescriptor>, |best, s| match best {
            Some(b) if b.height.unwrap_or(0) >= s.height.unwrap_or(0) => Some(b),
            _ => Some(s),
        })
    }

    /// Best audio-only stream (prefer m4a for compatibility, then bitrate)
    fn find_best_audio(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
        Self::max_by_abr(streams.iter().filter(|s| s.is_audio_only() && s.ext == "m4a"))
            .or_else(|| Self::max_by_abr(streams.iter().filter(|s| s.is_audio_only())))
    }

    fn max_by_abr<'a>(
        candidates: impl Iterator<Item = &'a StreamDescriptor>,
    ) -> Option<&'a StreamDescriptor> {
        candidates.fold(None::<&StreamDescriptor>, |best, s| match best {
            Some(b) if b.abr.unwrap_or(0.0) >= s.abr.unwrap_or(0.0) => Some(b),
            _ => Some(s),
        })
    }

    /// Format file size for display
    fn format_size(bytes: Option<u64>) -> Option<String> {
        bytes.map(|b| {
            let mb = b as f64 / 1_048_576.0;
            if mb >= 1024.0 {
                format!("{:.1} GB", mb / 1024.0)
            } else {
                format!("{:.0} MB", mb)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, height: u32, ext: &str) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind: MediaKind::Muxed,
            resolution: Some(format!("{}p", height)),
            ext: ext.to_string(),
            height: Some(height),
            abr: None,
            filesize: Some(height as u64 * 100_000),
        }
    }

    fn audio(id: &str, ext: &str, abr: f32) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind: MediaKind::AudioOnly,
            resolution: None,
            ext: ext.to_string(),
            height: None,
            abr: Some(abr),
            filesize: Some(3_000_000),
        }
    }

    fn exact(label: &str) -> ResolutionPreference {
        ResolutionPreference::Exact(label.to_string())
    }

    #[test]
    fn exact_resolution_is_selected() {
        let streams = vec![video("22", 720, "mp4"), video("37", 1080, "mp4")];
        let picked = FormatSelector::select(&streams, OutputFormat::Mp4, &exact("1080p")).unwrap();
        assert_eq!(picked.format_id, "37");
        assert_eq!(picked.resolution.as_deref(), Some("1080p"));
    }

    #[test]
    fn missing_resolution_is_not_found() {
        let streams = vec![video("22", 720, "mp4")];
        let err = FormatSelector::select(&streams, OutputFormat::Mp4, &exact("4K")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn exact_match_never_falls_back() {
        let streams = vec![video("22", 720, "mp4"), video("37", 1080, "mp4")];
        assert!(FormatSelector::select(&streams, OutputFormat::Mp4, &exact("1079p")).is_err());
        assert!(FormatSelector::select(&streams, OutputFormat::Mp4, &exact("720")).is_err());
    }

    #[test]
    fn first_exact_match_wins() {
        let streams = vec![video("a", 720, "mp4"), video("b", 720, "mp4")];
        let picked = FormatSelector::select(&streams, OutputFormat::Mp4, &exact("720p")).unwrap();
        assert_eq!(picked.format_id, "a");
    }

    #[test]
    fn exact_match_ignores_other_containers() {
        let streams = vec![video("43", 720, "webm")];
        assert!(FormatSelector::select(&streams, OutputFormat::Mp4, &exact("720p")).is_err());
    }

    #[test]
    fn highest_resolution_is_selected() {
        let streams = vec![
            video("18", 360, "mp4"),
            video("37", 1080, "mp4"),
            video("22", 720, "mp4"),
            video("46", 2160, "webm"),
        ];
        let picked =
            FormatSelector::select(&streams, OutputFormat::Mp4, &ResolutionPreference::Highest).unwrap();
        assert_eq!(picked.format_id, "37");
    }

    #[test]
    fn highest_without_video_is_not_found() {
        let streams = vec![audio("140", "m4a", 128.0)];
        let err = FormatSelector::select(&streams, OutputFormat::Mp4, &ResolutionPreference::Highest)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn audio_request_returns_audio_only_stream() {
        let streams = vec![
            video("22", 720, "mp4"),
            audio("251", "webm", 160.0),
            audio("140", "m4a", 128.0),
        ];
        let picked = FormatSelector::select(&streams, OutputFormat::Mp3, &exact("720p")).unwrap();
        assert!(picked.is_audio_only());
        assert_eq!(picked.format_id, "140");
    }

    #[test]
    fn audio_falls_back_to_any_container() {
        let streams = vec![audio("250", "webm", 64.0), audio("251", "webm", 160.0)];
        let picked =
            FormatSelector::select(&streams, OutputFormat::Mp3, &ResolutionPreference::Highest).unwrap();
        assert_eq!(picked.format_id, "251");
    }

    #[test]
    fn audio_without_audio_streams_is_not_found() {
        let streams = vec![video("22", 720, "mp4")];
        let err = FormatSelector::select(&streams, OutputFormat::Mp3, &ResolutionPreference::Highest)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn resolutions_are_distinct_and_sorted() {
        let streams = vec![
            video("18", 360, "mp4"),
            video("37", 1080, "mp4"),
            video("22", 720, "mp4"),
            video("22b", 720, "mp4"),
            video("43", 480, "webm"),
        ];
        assert_eq!(
            FormatSelector::available_resolutions(&streams, OutputFormat::Mp4),
            vec!["1080p", "720p", "360p"]
        );
        assert!(FormatSelector::available_resolutions(&streams, OutputFormat::Mp3).is_empty());
    }

    #[test]
    fn quality_options_include_audio_last() {
        let streams = vec![video("22", 720, "mp4"), audio("140", "m4a", 128.0)];
        let options = FormatSelector::quality_options(&streams);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].value, "720p");
        assert!(options[0].label.starts_with("720p (mp4"));
        assert_eq!(options.last().unwrap().value, "audio");
    }

    #[test]
    fn size_formatting() {
        assert_eq!(FormatSelector::format_size(Some(52_428_800)), Some("50 MB".to_string()));
        assert_eq!(FormatSelector::format_size(Some(2_147_483_648)), Some("2.0 GB".to_string()));
        assert_eq!(FormatSelector::format_size(None), None);
    }
}
