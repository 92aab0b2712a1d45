use std::path::{Path, PathBuf};

use tracing::debug;

use super::errors::DownloadError;
use super::utils::file_path_for;

/// Thumbnail image bytes as served
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Thumbnail {
    /// File extension matching the image type
    pub fn extension(&self) -> &'static str {
        let content_type = self.content_type.as_deref().unwrap_or("");
        let url = self.url.to_lowercase();
        if content_type.contains("webp") || url.ends_with(".webp") {
            "webp"
        } else if content_type.contains("png") || url.ends_with(".png") {
            "png"
        } else {
            "jpg"
        }
    }

    /// Write the image as `<dir>/<title>.<ext>`
    pub async fn save(&self, dir: &Path, title: &str) -> Result<PathBuf, DownloadError> {
        let path = file_path_for(dir, title, self.extension());
        tokio::fs::write(&path, &self.bytes)
            .await
            .map_err(|e| DownloadError::io(&path, &e))?;
        Ok(path)
    }
}

/// The service-reported thumbnail, or the standard one for `video_id`
pub fn thumbnail_url(reported: &str, video_id: &str) -> String {
    if reported.trim().is_empty() {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
    } else {
        reported.trim().to_string()
    }
}

/// Download a thumbnail image
pub async fn fetch_thumbnail(client: &reqwest::Client, url: &str) -> Result<Thumbnail, DownloadError> {
    debug!(%url, "fetching thumbnail");
    let response = client.get(url).send().await?.error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let bytes = response.bytes().await?.to_vec();
    if bytes.is_empty() {
        return Err(DownloadError::Network(format!("empty thumbnail from {}", url)));
    }

    Ok(Thumbnail {
        url: url.to_string(),
        content_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumb(url: &str, content_type: Option<&str>) -> Thumbnail {
        Thumbnail {
            url: url.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[test]
    fn falls_back_to_standard_url() {
        assert_eq!(
            thumbnail_url("", "dQw4w9WgXcQ"),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert_eq!(thumbnail_url(" https://x/y.webp ", "id"), "https://x/y.webp");
    }

    #[test]
    fn extension_from_content_type_or_url() {
        assert_eq!(thumb("https://x/a", Some("image/webp")).extension(), "webp");
        assert_eq!(thumb("https://x/a.PNG", None).extension(), "png");
        assert_eq!(thumb("https://x/a", Some("image/jpeg")).extension(), "jpg");
    }

    #[tokio::test]
    async fn saves_under_sanitized_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = thumb("https://x/a.jpg", None)
            .save(dir.path(), "AC/DC: Live")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("AC_DC_ Live.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }
}
