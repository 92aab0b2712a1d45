// InfoExtractor module - video info extraction through yt-dlp
//
// The extractor asks yt-dlp for metadata and the list of streams; the
// diagnostics module turns yt-dlp failures into user-facing hints.

mod cli;
mod diagnostics;
mod traits;

pub use cli::CliInfoExtractor;
pub use diagnostics::{diagnose_error, BlockingReason};
pub use traits::{ExtractorConfig, InfoExtractor};
