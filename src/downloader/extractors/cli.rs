// Metadata extraction through `yt-dlp --dump-json`
//
// Keeps only the streams that can be fetched
// as one file: muxed video+audio and audio-only. Video-only streams would
// need a second stream merged in, so they are dropped here.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::traits::{ExtractorConfig, InfoExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaKind, StreamDescriptor, VideoInfo, VideoRef};
use crate::downloader::utils::{get_proxy_args, get_timeout_args, run_output_with_timeout};

/// Runs the yt-dlp executable and parses its JSON report
pub struct CliInfoExtractor {
    ytdlp_path: String,
}

impl CliInfoExtractor {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    /// Arguments for a metadata-only run
    fn build_args(&self, video: &VideoRef, config: &ExtractorConfig) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];
        args.extend(get_timeout_args(&config.network));

        if let Some(client) = &config.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }

        if let Some(path) = &config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        args.extend(get_proxy_args(&config.network));

        args.push(video.watch_url());
        args
    }

    /// Parse `--dump-json` output
    pub(crate) fn parse_json(stdout: &[u8]) -> Result<VideoInfo, DownloadError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::Parse(format!("Invalid JSON: {}", e)))?;

        let streams = Self::parse_streams(&json)?;

        Ok(VideoInfo {
            id: json["id"].as_str().unwrap_or("unknown").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
            duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
            thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
            streams,
        })
    }

    fn parse_streams(json: &serde_json::Value) -> Result<Vec<StreamDescriptor>, DownloadError> {
        let formats_array = json["formats"]
            .as_array()
            .ok_or_else(|| DownloadError::Parse("No formats array in JSON".to_string()))?;

        let mut streams = Vec::new();
        let mut skipped = 0usize;

        for f in formats_array {
            let has_video = f["vcodec"].as_str().map_or(false, |v| v != "none" && !v.is_empty());
            let has_audio = f["acodec"].as_str().map_or(false, |a| a != "none" && !a.is_empty());

            let kind = match (has_video, has_audio) {
                (true, true) => MediaKind::Muxed,
                (false, true) => MediaKind::AudioOnly,
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let height = f["height"].as_u64().map(|h| h as u32);
            let resolution = match kind {
                MediaKind::Muxed => height.map(|h| format!("{}p", h)),
                MediaKind::AudioOnly => None,
            };

            streams.push(StreamDescriptor {
                format_id: f["format_id"].as_str().unwrap_or("").to_string(),
                kind,
                resolution,
                ext: f["ext"].as_str().unwrap_or("").to_string(),
                height,
                abr: f["abr"].as_f64().map(|a| a as f32),
                filesize: f["filesize"].as_u64().or_else(|| f["filesize_approx"].as_u64()),
            });
        }

        debug!(kept = streams.len(), skipped, "parsed stream list");
        Ok(streams)
    }
}

#[async_trait]
impl InfoExtractor for CliInfoExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn extract(&self, video: &VideoRef, config: &ExtractorConfig) -> Result<VideoInfo, DownloadError> {
        let args = self.build_args(video, config);
        debug!(program = %self.ytdlp_path, args = %args.join(" "), "extracting video info");

        let out = run_output_with_timeout(&self.ytdlp_path, args, config.process_timeout_secs()).await?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            warn!(video = %video, %stderr, "yt-dlp metadata extraction failed");
            return Err(DownloadError::from(stderr));
        }

        let info = Self::parse_json(&out.stdout)?;
        info!(video = %video, title = %info.title, streams = info.streams.len(), "fetched video info");
        Ok(info)
    }
}
