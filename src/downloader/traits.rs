// Downloader backend trait definition

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::errors::DownloadError;
use super::models::{DownloadProgress, StreamDescriptor, VideoInfo, VideoRef};

/// Trait for the external video service
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Get video information and its streams
    async fn get_video_info(&self, video: &VideoRef) -> Result<VideoInfo, DownloadError>;

    /// Write `stream` into `dest_dir` and return the final file path.
    ///
    /// With `transcode_audio` set, the service converts the stream to that
    /// audio container itself.
    async fn fetch(
        &self,
        video: &VideoRef,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        transcode_audio: Option<&str>,
        progress: &ProgressEmitter,
    ) -> Result<PathBuf, DownloadError>;
}

/// Progress emitter helper
#[derive(Clone, Default)]
pub struct ProgressEmitter {
    tx: Option<UnboundedSender<DownloadProgress>>,
}

impl ProgressEmitter {
    pub fn new(tx: UnboundedSender<DownloadProgress>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Emitter that drops every event
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, progress: DownloadProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress);
        }
    }

    pub fn status(&self, percent: f32, status: impl Into<String>) {
        self.emit(DownloadProgress {
            percent,
            status: status.into(),
        });
    }
}
