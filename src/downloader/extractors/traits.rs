use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::{AppConfig, NetworkConfig};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{VideoInfo, VideoRef};

/// Socket timeout assumed when the network config leaves it unset
const FALLBACK_TIMEOUT_SECS: u32 = 30;

/// Options passed to yt-dlp on every invocation
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub network: NetworkConfig,
    pub cookies_path: Option<PathBuf>,
    /// yt-dlp `player_client` extractor arg (android, web, tv)
    pub player_client: Option<String>,
}

impl ExtractorConfig {
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.network.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.network.timeout = Some(seconds);
        self
    }

    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    /// Wall-clock limit for one metadata run
    pub fn process_timeout_secs(&self) -> u64 {
        u64::from(self.network.timeout.unwrap_or(FALLBACK_TIMEOUT_SECS))
    }
}

impl From<&AppConfig> for ExtractorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            network: config.network.clone(),
            cookies_path: config.cookies_path.clone(),
            player_client: config.player_client.clone(),
        }
    }
}

/// Resolves a video reference into its metadata and stream list
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, video: &VideoRef, config: &ExtractorConfig) -> Result<VideoInfo, DownloadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_network_and_cookies_from_app_config() {
        let app = AppConfig::default()
            .with_proxy(Some("socks5://127.0.0.1:1080".into()))
            .with_timeout(Some(10))
            .with_cookies_path(Some("/tmp/cookies.txt".into()))
            .with_player_client(Some("android".into()));
        let config = ExtractorConfig::from(&app);

        assert_eq!(config.network.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.network.timeout, Some(10));
        assert_eq!(config.cookies_path, Some(PathBuf::from("/tmp/cookies.txt")));
        assert_eq!(config.player_client.as_deref(), Some("android"));
        assert_eq!(config.process_timeout_secs(), 10);
    }

    #[test]
    fn unset_timeout_uses_fallback() {
        let mut config = ExtractorConfig::default();
        config.network.timeout = None;
        assert_eq!(config.process_timeout_secs(), 30);
    }
}
