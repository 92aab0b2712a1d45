// Downloader module: stream selection, fetching and audio post-processing

pub mod backends;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod postprocess;
pub mod preview;
pub mod progress;
pub mod thumbnail;
pub mod tools;
pub mod traits;
pub mod utils;

pub use errors::DownloadError;
pub use format_selector::{FormatSelector, QualityOption};
pub use models::{
    DownloadProgress, DownloadRequest, MediaKind, OutputFormat, ResolutionPreference, StreamDescriptor,
    VideoInfo, VideoRef,
};
pub use orchestrator::Downloader;
pub use preview::{Preview, PreviewInfo};
pub use traits::{DownloaderBackend, ProgressEmitter};
