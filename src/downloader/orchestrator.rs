// Orchestrator: select -> fetch -> (rename) for one request at a time

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::backends::YtDlpBackend;
use super::errors::DownloadError;
use super::extractors::ExtractorConfig;
use super::format_selector::FormatSelector;
use super::models::{DownloadRequest, OutputFormat, StreamDescriptor, VideoInfo, VideoRef};
use super::postprocess::mark_as_audio;
use super::preview::{Preview, PreviewInfo};
use super::thumbnail::{fetch_thumbnail, thumbnail_url};
use super::traits::{DownloaderBackend, ProgressEmitter};
use crate::config::{AppConfig, AudioStrategy};

pub struct Downloader {
    backend: Box<dyn DownloaderBackend>,
    http: reqwest::Client,
    audio_strategy: AudioStrategy,
    fetch_thumbnails: bool,
}

impl Downloader {
    pub fn new(backend: Box<dyn DownloaderBackend>, http: reqwest::Client) -> Self {
        Self {
            backend,
            http,
            audio_strategy: AudioStrategy::default(),
            fetch_thumbnails: true,
        }
    }

    /// yt-dlp backed downloader built from application config
    pub fn from_config(config: &AppConfig) -> Result<Self, DownloadError> {
        let backend = YtDlpBackend::new(config.ytdlp_path.clone(), ExtractorConfig::from(config));
        let http = config.network.http_client()?;
        Ok(Self::new(Box::new(backend), http).with_audio_strategy(config.audio_strategy))
    }

    pub fn with_audio_strategy(mut self, strategy: AudioStrategy) -> Self {
        self.audio_strategy = strategy;
        self
    }

    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.fetch_thumbnails = enabled;
        self
    }

    pub async fn video_info(&self, video: &VideoRef) -> Result<VideoInfo, DownloadError> {
        debug!(backend = self.backend.name(), video = %video, "requesting video info");
        self.backend.get_video_info(video).await
    }

    /// Title, thumbnail and selectable qualities for `input`.
    ///
    /// Never fails: anything that goes wrong yields `Preview::Unavailable`.
    pub async fn preview(&self, input: &str) -> Preview {
        let video = match VideoRef::parse(input) {
            Ok(video) => video,
            Err(e) => {
                debug!(input, error = %e, "preview unavailable");
                return Preview::unavailable(e.to_string());
            }
        };

        let info = match self.video_info(&video).await {
            Ok(info) => info,
            Err(e) => {
                debug!(video = %video, error = %e, "preview unavailable");
                return Preview::unavailable(e.to_string());
            }
        };

        let thumb_url = thumbnail_url(&info.thumbnail, video.id());
        let thumbnail = if self.fetch_thumbnails {
            match fetch_thumbnail(&self.http, &thumb_url).await {
                Ok(thumbnail) => Some(thumbnail),
                Err(e) => {
                    warn!(url = %thumb_url, error = %e, "thumbnail fetch failed");
                    None
                }
            }
        } else {
            None
        };

        Preview::Ready(Box::new(PreviewInfo {
            resolutions: FormatSelector::available_resolutions(&info.streams, OutputFormat::Mp4),
            options: FormatSelector::quality_options(&info.streams),
            duration: info.duration(),
            video,
            title: info.title,
            uploader: info.uploader,
            thumbnail_url: thumb_url,
            thumbnail,
            streams: info.streams,
        }))
    }

    /// Resolve streams, then select, fetch and post-process
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: &ProgressEmitter,
    ) -> Result<PathBuf, DownloadError> {
        let info = self.video_info(&request.video).await?;
        self.download_from(request, &info.streams, progress).await
    }

    /// Same as `download`, selecting among `streams` already resolved for a
    /// preview instead of asking the service again
    pub async fn download_from(
        &self,
        request: &DownloadRequest,
        streams: &[StreamDescriptor],
        progress: &ProgressEmitter,
    ) -> Result<PathBuf, DownloadError> {
        let stream = FormatSelector::select(streams, request.format, &request.resolution)?;
        info!(
            video = %request.video,
            url = request.video.url(),
            format = %request.format,
            format_id = %stream.format_id,
            resolution = stream.resolution.as_deref().unwrap_or("audio"),
            ext = %stream.ext,
            "selected stream"
        );

        let transcode = match (request.format.is_audio(), self.audio_strategy) {
            (true, AudioStrategy::Transcode) => Some(request.format.extension()),
            _ => None,
        };

        let fetched = self
            .backend
            .fetch(&request.video, stream, &request.dest_dir, transcode, progress)
            .await?;

        if request.format.is_audio() && transcode.is_none() {
            let renamed = mark_as_audio(&fetched).await?;
            progress.status(100.0, format!("Saved as {}", renamed.display()));
            return Ok(renamed);
        }

        Ok(fetched)
    }
}
