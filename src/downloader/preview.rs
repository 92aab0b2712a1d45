use serde::Serialize;

use super::format_selector::QualityOption;
use super::models::{StreamDescriptor, VideoRef};
use super::thumbnail::Thumbnail;

/// What the user sees while a URL is being entered
#[derive(Debug, Clone)]
pub enum Preview {
    Ready(Box<PreviewInfo>),
    /// The URL could not be previewed; `reason` is for display, not an error
    Unavailable { reason: String },
}

impl Preview {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewInfo {
    pub video: VideoRef,
    pub title: String,
    pub uploader: String,
    pub duration: String,
    pub thumbnail_url: String,
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
    /// Resolution labels selectable for mp4 output, highest first
    pub resolutions: Vec<String>,
    pub options: Vec<QualityOption>,
    /// Streams the options were built from; a download started from this
    /// preview selects among these
    #[serde(skip)]
    pub streams: Vec<StreamDescriptor>,
}
