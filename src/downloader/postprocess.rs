// Audio post-processing: rename the fetched file's extension to mp3
//
// The bytes are not re-encoded. An m4a/webm stream renamed to .mp3 still
// holds AAC/Opus data; most players sniff the content and cope, strict
// MP3 decoders will not. `AudioStrategy::Transcode` avoids this.

use std::path::{Path, PathBuf};

use tracing::warn;

use super::errors::DownloadError;
use super::models::OutputFormat;

/// Replace `path`'s extension with the audio container extension.
///
/// Fails if the source is missing, if the target already exists, or if
/// `path` already carries the audio extension.
pub async fn mark_as_audio(path: &Path) -> Result<PathBuf, DownloadError> {
    let audio_ext = OutputFormat::Mp3.extension();

    let current_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    if current_ext.as_deref() == Some(audio_ext) {
        return Err(DownloadError::InvalidInput(format!(
            "{} already has the .{} extension",
            path.display(),
            audio_ext
        )));
    }

    let target = path.with_extension(audio_ext);

    // link + unlink instead of rename: linking fails when the target name
    // is taken, where rename would replace it
    tokio::fs::hard_link(path, &target).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            DownloadError::io(&target, &e)
        } else {
            DownloadError::io(path, &e)
        }
    })?;

    warn!(
        from = %path.display(),
        to = %target.display(),
        "renamed audio stream to .{} without re-encoding; container is unchanged",
        audio_ext
    );

    tokio::fs::remove_file(path)
        .await
        .map_err(|e| DownloadError::io(path, &e))?;

    Ok(target)
}
