// Blocking diagnostics - identifies why the video service refused a request
//
// Maps raw yt-dlp stderr to a reason and a suggestion for the user.

use serde::{Deserialize, Serialize};

/// Why the video service refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    Http403Forbidden,
    AgeRestricted,
    GeoBlocked,
    /// Often a soft IP block rather than a real network fault
    NetworkTimeout,
    RateLimited,
    BotDetection,
    PrivateVideo,
    VideoUnavailable,
    /// DRM or paid content
    DrmProtected,
    MembersOnly,
}

/// Stderr fragments per reason, checked top to bottom. Permanent and
/// content-specific reasons come before the generic HTTP and network ones,
/// since yt-dlp often reports both.
const RULES: &[(BlockingReason, &[&str])] = &[
    (
        BlockingReason::DrmProtected,
        &["drm", "widevine", "playready", "fairplay", "requires purchase", "rental", "requires payment"],
    ),
    (
        BlockingReason::MembersOnly,
        &["members only", "members-only", "join this channel", "available to members"],
    ),
    (
        BlockingReason::AgeRestricted,
        &["age-restricted", "sign in to confirm your age", "age_verification"],
    ),
    (
        BlockingReason::PrivateVideo,
        &["private video", "video is private", "sign in if you've been granted access"],
    ),
    (
        BlockingReason::VideoUnavailable,
        &["video unavailable", "video has been removed", "no longer available", "video is unavailable"],
    ),
    (
        BlockingReason::GeoBlocked,
        &["not available in your country", "not made this video available in your country", "blocked in your country", "geo restrict"],
    ),
    (BlockingReason::RateLimited, &["429", "rate limit", "too many requests"]),
    (BlockingReason::BotDetection, &["not a bot", "captcha", "unusual traffic"]),
    (BlockingReason::Http403Forbidden, &["403", "forbidden"]),
    (
        BlockingReason::NetworkTimeout,
        &["timeout", "timed out", "connection refused", "network is unreachable"],
    ),
];

impl BlockingReason {
    /// Whether routing through another IP could change the outcome
    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::GeoBlocked
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
        )
    }

    /// No configuration change will make this video downloadable
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DrmProtected | Self::VideoUnavailable)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::MembersOnly => "Members-only content",
        }
    }

    /// What the user can try next
    pub fn suggestion(&self, proxy: Option<&str>) -> String {
        let mut suggestion = match self {
            Self::Http403Forbidden => "What to try:\n\
                 1) Use a VPN/Proxy (--proxy socks5://...)\n\
                 2) Pass a cookies.txt exported from a logged-in browser (--cookies)\n\
                 3) Update yt-dlp and try again later"
                .to_string(),
            Self::AgeRestricted => "Video is age-restricted.\n\
                 Pass a cookies.txt from a logged-in 18+ account (--cookies)."
                .to_string(),
            Self::GeoBlocked => "Video is blocked in your country.\n\
                 Use a proxy or VPN in an allowed region."
                .to_string(),
            Self::NetworkTimeout => "What to try:\n\
                 1) Check your internet connection\n\
                 2) Raise --timeout or use a proxy\n\
                 3) Try again later"
                .to_string(),
            Self::RateLimited => "YouTube is rate-limiting requests.\n\
                 Wait 10-15 minutes or switch IP (VPN/proxy)."
                .to_string(),
            Self::BotDetection => "YouTube detected automated access.\n\
                 Use cookies from a logged-in browser or a fresh proxy."
                .to_string(),
            Self::PrivateVideo => "Video is private.\n\
                 Cookies from an account with access are required."
                .to_string(),
            Self::VideoUnavailable => "It may have been deleted, removed for copyright, or made private."
                .to_string(),
            Self::DrmProtected => "This video is protected by DRM and cannot be downloaded as a file."
                .to_string(),
            Self::MembersOnly => "This video requires channel membership.\n\
                 Use cookies from a browser where you are logged in as a member."
                .to_string(),
        };

        if !self.is_permanent() {
            if let Some(p) = proxy {
                suggestion.push_str(&format!("\n\nProxy in use: {}", p));
            }
        }

        suggestion
    }
}

/// Classify raw service stderr; `None` when nothing is recognised
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(reason, _)| *reason)
}
