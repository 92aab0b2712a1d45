// Application configuration: defaults, then environment, then CLI flags

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::downloader::errors::DownloadError;
use crate::downloader::utils::find_ytdlp;

pub const ENV_YTDLP: &str = "VIDEO_SAVER_YTDLP";
pub const ENV_DOWNLOAD_DIR: &str = "VIDEO_SAVER_DOWNLOAD_DIR";
pub const ENV_PROXY: &str = "VIDEO_SAVER_PROXY";

/// How an audio request becomes an `.mp3` file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioStrategy {
    /// Fetch the audio-only stream and rename its extension. The bytes are
    /// not converted: the file keeps its original container.
    #[default]
    Rename,
    /// Let yt-dlp convert the audio stream with ffmpeg
    Transcode,
}

/// Network configuration for the video service and thumbnail fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
        }
    }
}

impl NetworkConfig {
    /// HTTP client honouring the proxy and timeout
    pub fn http_client(&self) -> Result<reqwest::Client, DownloadError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));

        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs as u64));
        }

        if let Some(proxy_url) = self.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DownloadError::InvalidInput(format!("invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(DownloadError::from)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where files are saved
    pub download_dir: PathBuf,
    /// yt-dlp executable
    pub ytdlp_path: String,
    pub network: NetworkConfig,
    /// cookies.txt passed to yt-dlp
    pub cookies_path: Option<PathBuf>,
    /// yt-dlp `player_client` extractor arg (android, web, tv)
    pub player_client: Option<String>,
    pub audio_strategy: AudioStrategy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            ytdlp_path: "yt-dlp".to_string(),
            network: NetworkConfig::default(),
            cookies_path: None,
            player_client: None,
            audio_strategy: AudioStrategy::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `VIDEO_SAVER_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        config.ytdlp_path = non_empty(ENV_YTDLP).unwrap_or_else(find_ytdlp);
        if let Some(dir) = non_empty(ENV_DOWNLOAD_DIR) {
            config.download_dir = PathBuf::from(dir);
        }
        config.network.proxy = non_empty(ENV_PROXY);
        config
    }

    pub fn with_download_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.download_dir = dir;
        }
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        if proxy.is_some() {
            self.network.proxy = proxy;
        }
        self
    }

    pub fn with_timeout(mut self, seconds: Option<u32>) -> Self {
        if seconds.is_some() {
            self.network.timeout = seconds;
        }
        self
    }

    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.cookies_path = path;
        }
        self
    }

    pub fn with_player_client(mut self, client: Option<String>) -> Self {
        if client.is_some() {
            self.player_client = client;
        }
        self
    }

    pub fn with_audio_strategy(mut self, strategy: AudioStrategy) -> Self {
        self.audio_strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_YTDLP, "/opt/bin/yt-dlp"),
            (ENV_DOWNLOAD_DIR, "/srv/media"),
            (ENV_PROXY, "socks5h://127.0.0.1:1080"),
        ]));
        assert_eq!(config.ytdlp_path, "/opt/bin/yt-dlp");
        assert_eq!(config.download_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.network.proxy.as_deref(), Some("socks5h://127.0.0.1:1080"));
        assert_eq!(config.network.timeout, Some(30));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup_from(&[(ENV_YTDLP, "/x/yt-dlp"), (ENV_PROXY, "  ")]));
        assert_eq!(config.network.proxy, None);
    }

    #[test]
    fn flags_override_env() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_YTDLP, "/x/yt-dlp"),
            (ENV_PROXY, "socks5://env:1"),
        ]))
        .with_proxy(Some("socks5://flag:2".to_string()))
        .with_download_dir(Some(PathBuf::from("/flag")))
        .with_timeout(None)
        .with_audio_strategy(AudioStrategy::Transcode);

        assert_eq!(config.network.proxy.as_deref(), Some("socks5://flag:2"));
        assert_eq!(config.download_dir, PathBuf::from("/flag"));
        assert_eq!(config.network.timeout, Some(30));
        assert_eq!(config.audio_strategy, AudioStrategy::Transcode);
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let network = NetworkConfig {
            proxy: Some("::not a proxy::".to_string()),
            timeout: None,
        };
        assert!(matches!(network.http_client(), Err(DownloadError::InvalidInput(_))));
    }
}
