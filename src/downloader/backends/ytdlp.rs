use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::{CliInfoExtractor, ExtractorConfig, InfoExtractor};
use crate::downloader::models::{StreamDescriptor, VideoInfo, VideoRef};
use crate::downloader::progress::{parse_output_line, OutputEvent, SAVED_MARKER};
use crate::downloader::traits::{DownloaderBackend, ProgressEmitter};
use crate::downloader::utils::{ensure_writable_dir, get_proxy_args, get_timeout_args, spawn_error};

/// Filename template: the video's title and the stream's own extension
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

pub struct YtDlpBackend {
    ytdlp_bin: String,
    extractor: CliInfoExtractor,
    config: ExtractorConfig,
}

impl YtDlpBackend {
    pub fn new(ytdlp_bin: impl Into<String>, config: ExtractorConfig) -> Self {
        let ytdlp_bin = ytdlp_bin.into();
        Self {
            extractor: CliInfoExtractor::new(ytdlp_bin.clone()),
            ytdlp_bin,
            config,
        }
    }

    fn build_fetch_args(
        &self,
        video: &VideoRef,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        transcode_audio: Option<&str>,
    ) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            stream.format_id.clone(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", SAVED_MARKER),
            // --print implies --quiet, which hides the Destination and
            // already-downloaded lines the tracker reads
            "--no-quiet".to_string(),
            "-o".to_string(),
            dest_dir.join(OUTPUT_TEMPLATE).to_string_lossy().to_string(),
        ];

        if let Some(audio_format) = transcode_audio {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(audio_format.to_string());
        }

        args.extend(get_timeout_args(&self.config.network));
        args.extend(get_proxy_args(&self.config.network));

        if let Some(path) = &self.config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        args.push(video.watch_url());
        args
    }
}

/// Tracks the output file yt-dlp reports while it runs
#[derive(Debug, Default)]
struct OutputTracker {
    saved: Option<String>,
    existing: Option<String>,
    destination: Option<String>,
}

impl OutputTracker {
    fn observe(&mut self, line: &str, progress: &ProgressEmitter) {
        match parse_output_line(line) {
            Some(OutputEvent::Progress(p)) => progress.emit(p),
            Some(OutputEvent::Destination(path)) => {
                progress.status(0.0, format!("Saving to {}", path));
                self.destination = Some(path);
            }
            Some(OutputEvent::AlreadyDownloaded(path)) => {
                progress.status(100.0, "File already downloaded");
                self.existing = Some(path);
            }
            Some(OutputEvent::Saved(path)) => self.saved = Some(path),
            None => {}
        }
    }

    fn final_path(self) -> Option<PathBuf> {
        self.saved
            .or(self.existing)
            .or(self.destination)
            .map(PathBuf::from)
    }
}

#[async_trait]
impl DownloaderBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn get_video_info(&self, video: &VideoRef) -> Result<VideoInfo, DownloadError> {
        debug!(extractor = self.extractor.name(), video = %video, "resolving streams");
        self.extractor.extract(video, &self.config).await
    }

    async fn fetch(
        &self,
        video: &VideoRef,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        transcode_audio: Option<&str>,
        progress: &ProgressEmitter,
    ) -> Result<PathBuf, DownloadError> {
        ensure_writable_dir(dest_dir).await?;

        let args = self.build_fetch_args(video, stream, dest_dir, transcode_audio);
        debug!(program = %self.ytdlp_bin, args = %args.join(" "), "starting fetch");
        progress.status(0.0, format!("Starting download of stream {}", stream.format_id));

        let mut child = Command::new(&self.ytdlp_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.ytdlp_bin, &e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Service("Failed to capture yt-dlp stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Service("Failed to capture yt-dlp stderr".to_string()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut stderr_text = String::new();
        let mut tracker = OutputTracker::default();
        let (mut out_done, mut err_done) = (false, false);

        let read_error = |e: std::io::Error| DownloadError::Service(format!("Failed to read yt-dlp output: {}", e));

        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line.map_err(read_error)? {
                    Some(line) => tracker.observe(&line, progress),
                    None => out_done = true,
                },
                line = err_lines.next_line(), if !err_done => match line.map_err(read_error)? {
                    Some(line) => {
                        tracker.observe(&line, progress);
                        stderr_text.push_str(&line);
                        stderr_text.push('\n');
                    }
                    None => err_done = true,
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::Service(format!("Failed to wait for yt-dlp: {}", e)))?;

        if !status.success() {
            let stderr_text = stderr_text.trim().to_string();
            warn!(video = %video, format_id = %stream.format_id, stderr = %stderr_text, "fetch failed");
            return Err(DownloadError::from(stderr_text));
        }

        let path = tracker.final_path().ok_or_else(|| {
            DownloadError::Service("yt-dlp finished without reporting an output file".to_string())
        })?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let e = std::io::Error::new(std::io::ErrorKind::NotFound, "reported output file is missing");
            return Err(DownloadError::io(&path, &e));
        }

        info!(video = %video, path = %path.display(), "fetch complete");
        progress.status(100.0, "Download complete");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::MediaKind;

    fn audio_stream() -> StreamDescriptor {
        StreamDescriptor {
            format_id: "140".to_string(),
            kind: MediaKind::AudioOnly,
            resolution: None,
            ext: "m4a".to_string(),
            height: None,
            abr: Some(129.5),
            filesize: None,
        }
    }

    #[test]
    fn fetch_args_select_exactly_one_stream() {
        let backend = YtDlpBackend::new("yt-dlp", ExtractorConfig::default());
        let video = VideoRef::parse("dQw4w9WgXcQ").unwrap();
        let args = backend.build_fetch_args(&video, &audio_stream(), Path::new("/dl"), None);

        assert_eq!(&args[..2], ["-f", "140"]);
        assert!(args.windows(2).any(|w| w == ["-o", "/dl/%(title)s.%(ext)s"]));
        assert!(args.windows(2).any(|w| w == ["--print", "after_move:SAVED:%(filepath)s"]));
        assert!(args.contains(&"--no-quiet".to_string()));
        assert!(!args.contains(&"-x".to_string()));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn fetch_args_transcode_audio() {
        let backend = YtDlpBackend::new("yt-dlp", ExtractorConfig::default());
        let video = VideoRef::parse("dQw4w9WgXcQ").unwrap();
        let args = backend.build_fetch_args(&video, &audio_stream(), Path::new("/dl"), Some("mp3"));
        assert!(args.windows(3).any(|w| w == ["-x", "--audio-format", "mp3"]));
    }

    #[test]
    fn tracker_prefers_saved_path() {
        let progress = ProgressEmitter::silent();
        let mut tracker = OutputTracker::default();
        tracker.observe("[download] Destination: /dl/Title.f140.m4a", &progress);
        tracker.observe("[download]  50.0% of 3.27MiB at 1.00MiB/s ETA 00:02", &progress);
        tracker.observe("SAVED:/dl/Title.m4a", &progress);
        assert_eq!(tracker.final_path(), Some(PathBuf::from("/dl/Title.m4a")));
    }

    #[test]
    fn tracker_falls_back_to_existing_file() {
        let progress = ProgressEmitter::silent();
        let mut tracker = OutputTracker::default();
        tracker.observe("[download] /dl/Title.m4a has already been downloaded", &progress);
        assert_eq!(tracker.final_path(), Some(PathBuf::from("/dl/Title.m4a")));
    }

    #[tokio::test]
    async fn tracker_forwards_progress() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let progress = ProgressEmitter::new(tx);
        let mut tracker = OutputTracker::default();
        tracker.observe("[download]  42.0% of 10.00MiB at 2.00MiB/s ETA 00:03", &progress);
        let event = rx.recv().await.unwrap();
        assert!((event.percent - 42.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn unwritable_destination_fails_before_spawning() {
        let backend = YtDlpBackend::new("definitely-not-a-real-binary-xyz", ExtractorConfig::default());
        let video = VideoRef::parse("dQw4w9WgXcQ").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = backend
            .fetch(&video, &audio_stream(), &missing, None, &ProgressEmitter::silent())
            .await
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn missing_binary_is_tool_not_found() {
        let backend = YtDlpBackend::new("definitely-not-a-real-binary-xyz", ExtractorConfig::default());
        let video = VideoRef::parse("dQw4w9WgXcQ").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = backend
            .fetch(&video, &audio_stream(), dir.path(), None, &ProgressEmitter::silent())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn unreadable_output_stops_the_process() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = dir.path().join("fake-yt-dlp");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho $$ > '{}'\nprintf '\\377\\376\\n'\nexec sleep 30\n",
                pid_file.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = YtDlpBackend::new(script.to_string_lossy(), ExtractorConfig::default());
        let video = VideoRef::parse("dQw4w9WgXcQ").unwrap();
        let err = backend
            .fetch(&video, &audio_stream(), dir.path(), None, &ProgressEmitter::silent())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Service(_)));

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        // gone, or a zombie awaiting reaping
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid.trim())) {
            let state = stat.rsplit(')').next().unwrap().trim_start().chars().next().unwrap();
            assert!(matches!(state, 'Z' | 'X'), "process still running: {}", stat);
        }
    }
}
