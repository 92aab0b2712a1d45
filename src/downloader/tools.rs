use serde::{Deserialize, Serialize};
use tracing::debug;

use super::utils::{find_binary, run_output_with_timeout};

/// Seconds allowed for a `--version` probe
const VERSION_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }

    /// What stops working without this tool
    pub fn needed_for(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "all downloads",
            ToolType::Ffmpeg => "mp3 transcoding",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Explicit yt-dlp location, checked before the usual search
    ytdlp_override: Option<String>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ytdlp_path(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_override = Some(path.into());
        self
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type);
        let version = match &path {
            Some(path) => Self::get_version(path, tool_type).await,
            None => None,
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            // a binary that cannot report its version is treated as unusable
            is_available: version.is_some(),
            version,
            path,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp).await,
            self.get_tool_info(ToolType::Ffmpeg).await,
        ]
    }

    fn locate(&self, tool_type: ToolType) -> Option<String> {
        match (tool_type, &self.ytdlp_override) {
            (ToolType::YtDlp, Some(path)) => Some(path.clone()),
            _ => find_binary(tool_type.as_str()),
        }
    }

    async fn get_version(path: &str, tool_type: ToolType) -> Option<String> {
        let args = vec![tool_type.version_arg().to_string()];
        match run_output_with_timeout(path, args, VERSION_TIMEOUT_SECS).await {
            Ok(output) if output.status.success() => {
                parse_version(tool_type, &String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!(tool = tool_type.as_str(), status = ?output.status, "version probe failed");
                None
            }
            Err(e) => {
                debug!(tool = tool_type.as_str(), error = %e, "version probe failed");
                None
            }
        }
    }
}

/// First meaningful token of a tool's version banner
fn parse_version(tool_type: ToolType, stdout: &str) -> Option<String> {
    let first_line = stdout.lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }
    match tool_type {
        // "ffmpeg version 6.1.1 Copyright (c) ..."
        ToolType::Ffmpeg => first_line
            .strip_prefix("ffmpeg version ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
            .or_else(|| Some(first_line.to_string())),
        ToolType::YtDlp => Some(first_line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_banners() {
        assert_eq!(
            parse_version(ToolType::YtDlp, "2024.08.06\n").as_deref(),
            Some("2024.08.06")
        );
        assert_eq!(
            parse_version(
                ToolType::Ffmpeg,
                "ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers\nbuilt with gcc"
            )
            .as_deref(),
            Some("6.1.1")
        );
        assert_eq!(parse_version(ToolType::YtDlp, ""), None);
    }

    #[tokio::test]
    async fn missing_override_is_unavailable() {
        let manager = ToolManager::new().with_ytdlp_path("/nonexistent/dir/yt-dlp");
        let info = manager.get_tool_info(ToolType::YtDlp).await;
        assert_eq!(info.name, "yt-dlp");
        assert_eq!(info.path.as_deref(), Some("/nonexistent/dir/yt-dlp"));
        assert!(!info.is_available);
        assert!(info.version.is_none());
    }
}
