// Command-line front end: preview, download, interactive prompt, tool status

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::config::{AppConfig, AudioStrategy};
use crate::downloader::extractors::diagnose_error;
use crate::downloader::tools::ToolManager;
use crate::downloader::{
    DownloadError, DownloadRequest, Downloader, OutputFormat, Preview, PreviewInfo, ProgressEmitter,
    ResolutionPreference, StreamDescriptor, VideoRef,
};

#[derive(Parser, Debug)]
#[command(name = "video-saver", version, about = "Save online videos as mp4, or their audio as mp3")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory files are saved to
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Proxy URL, e.g. socks5://127.0.0.1:1080
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Network timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u32>,

    /// cookies.txt exported from a logged-in browser
    #[arg(long, global = true)]
    pub cookies: Option<PathBuf>,

    /// yt-dlp player client to request streams with (android, web, tv)
    #[arg(long, global = true)]
    pub player_client: Option<String>,

    /// Convert audio to real mp3 with ffmpeg instead of renaming
    #[arg(long, global = true)]
    pub transcode: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show title, duration, thumbnail and available qualities
    Preview {
        url: String,

        /// Save the thumbnail into the output directory
        #[arg(long)]
        save_thumbnail: bool,
    },

    /// Download a video (mp4) or its audio (mp3)
    Download {
        url: String,

        #[arg(short, long, default_value = "mp4")]
        format: OutputFormat,

        /// Resolution label such as 720p, or "highest"
        #[arg(short, long, default_value = "highest")]
        resolution: ResolutionPreference,
    },

    /// Prompt for URLs and choices until EOF or "quit"
    Interactive,

    /// Report yt-dlp and ffmpeg availability
    Tools,
}

impl Cli {
    /// Environment-derived config overridden by flags
    pub fn config(&self) -> AppConfig {
        self.layer(AppConfig::from_env())
    }

    fn layer(&self, base: AppConfig) -> AppConfig {
        let strategy = if self.transcode {
            AudioStrategy::Transcode
        } else {
            base.audio_strategy
        };
        base.with_download_dir(self.output.clone())
            .with_proxy(self.proxy.clone())
            .with_timeout(self.timeout)
            .with_cookies_path(self.cookies.clone())
            .with_player_client(self.player_client.clone())
            .with_audio_strategy(strategy)
    }
}

pub async fn execute(cli: Cli) -> ExitCode {
    let config = cli.config();
    debug!(?config, "configuration resolved");

    let result = match cli.command {
        Command::Tools => {
            print_tools(&config).await;
            Ok(ExitCode::SUCCESS)
        }
        command => match Downloader::from_config(&config) {
            Ok(downloader) => run_command(command, &downloader, &config).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", render_error(&e, config.network.proxy.as_deref()));
            ExitCode::FAILURE
        }
    }
}

async fn run_command(
    command: Command,
    downloader: &Downloader,
    config: &AppConfig,
) -> Result<ExitCode, DownloadError> {
    match command {
        Command::Preview { url, save_thumbnail } => match downloader.preview(&url).await {
            Preview::Ready(preview) => {
                println!("{}", render_preview(&preview));
                if save_thumbnail {
                    save_thumbnail_of(&preview, config).await?;
                }
                Ok(ExitCode::SUCCESS)
            }
            Preview::Unavailable { reason } => {
                eprintln!("Preview unavailable: {}", reason);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Download {
            url,
            format,
            resolution,
        } => {
            let request = DownloadRequest {
                video: VideoRef::parse(&url)?,
                format,
                resolution,
                dest_dir: config.download_dir.clone(),
            };
            let path = download_with_progress(downloader, &request, None).await?;
            println!("Saved: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Interactive => {
            interactive(downloader, config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Tools => {
            print_tools(config).await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn save_thumbnail_of(preview: &PreviewInfo, config: &AppConfig) -> Result<(), DownloadError> {
    match &preview.thumbnail {
        Some(thumbnail) => {
            let path = thumbnail.save(&config.download_dir, &preview.title).await?;
            println!("Thumbnail: {}", path.display());
        }
        None => eprintln!("Thumbnail unavailable for {}", preview.video),
    }
    Ok(())
}

/// Run a download while printing progress lines to stderr
///
/// With `streams` from a preview, selection runs against those instead of a
/// fresh metadata lookup.
async fn download_with_progress(
    downloader: &Downloader,
    request: &DownloadRequest,
    streams: Option<&[StreamDescriptor]>,
) -> Result<PathBuf, DownloadError> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<crate::downloader::models::DownloadProgress>();
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            eprintln!("[{:5.1}%] {}", progress.percent, progress.status);
        }
    });

    let progress = ProgressEmitter::new(tx);
    let result = match streams {
        Some(streams) => downloader.download_from(request, streams, &progress).await,
        None => downloader.download(request, &progress).await,
    };
    drop(progress);
    let _ = printer.await;

    if let Ok(path) = &result {
        info!(video = %request.video, path = %path.display(), "download finished");
    }
    result
}

/// One answer read at a prompt
#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    /// The line could not be decoded; ask again
    Unreadable,
    Eof,
}

/// Print `label` and read one trimmed line
async fn prompt<R>(lines: &mut Lines<R>, label: &str) -> Result<Input, DownloadError>
where
    R: AsyncBufRead + Unpin,
{
    print!("{}", label);
    let _ = std::io::stdout().flush();
    match lines.next_line().await {
        Ok(Some(line)) => Ok(Input::Line(line.trim().to_string())),
        Ok(None) => Ok(Input::Eof),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            println!("\nCould not read that line: {}", e);
            Ok(Input::Unreadable)
        }
        Err(e) => Err(DownloadError::Service(format!("Failed to read input: {}", e))),
    }
}

async fn interactive(downloader: &Downloader, config: &AppConfig) -> Result<(), DownloadError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let proxy = config.network.proxy.as_deref();
    println!("Saving to {}. Enter a video URL, or \"quit\" to exit.", config.download_dir.display());

    loop {
        let url = match prompt(&mut lines, "\nURL> ").await? {
            Input::Line(url) => url,
            Input::Unreadable => continue,
            Input::Eof => break,
        };
        if url.is_empty() {
            continue;
        }
        if matches!(url.as_str(), "q" | "quit" | "exit") {
            break;
        }

        let preview = match downloader.preview(&url).await {
            Preview::Ready(preview) => preview,
            Preview::Unavailable { reason } => {
                println!("Preview unavailable: {}", reason);
                continue;
            }
        };
        println!("{}", render_preview(&preview));

        let answer = match prompt(&mut lines, "Format [mp4/mp3] (mp4): ").await? {
            Input::Line(answer) => answer,
            Input::Unreadable => continue,
            Input::Eof => break,
        };
        let format = if answer.is_empty() {
            OutputFormat::default()
        } else {
            match answer.parse::<OutputFormat>() {
                Ok(format) => format,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            }
        };

        let resolution = if format.is_audio() {
            ResolutionPreference::Highest
        } else {
            let label = format!("Resolution [{}] (highest): ", preview.resolutions.join("/"));
            let answer = match prompt(&mut lines, &label).await? {
                Input::Line(answer) => answer,
                Input::Unreadable => continue,
                Input::Eof => break,
            };
            if answer.is_empty() {
                ResolutionPreference::Highest
            } else {
                match answer.parse::<ResolutionPreference>() {
                    Ok(resolution) => resolution,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                }
            }
        };

        let request = DownloadRequest {
            video: preview.video.clone(),
            format,
            resolution,
            dest_dir: config.download_dir.clone(),
        };
        match download_with_progress(downloader, &request, Some(preview.streams.as_slice())).await {
            Ok(path) => println!("Saved: {}", path.display()),
            Err(e) => println!("{}", render_error(&e, proxy)),
        }
    }

    Ok(())
}

async fn print_tools(config: &AppConfig) {
    let manager = ToolManager::new().with_ytdlp_path(config.ytdlp_path.clone());
    for tool in manager.get_all_tools().await {
        let status = match (&tool.version, &tool.path) {
            (Some(version), Some(path)) => format!("{} ({})", version, path),
            (None, Some(path)) => format!("not working ({}); needed for {}", path, tool.tool_type.needed_for()),
            _ => format!("not found; needed for {}", tool.tool_type.needed_for()),
        };
        println!("{:<8} {}", tool.name, status);
    }
}

pub fn render_preview(preview: &PreviewInfo) -> String {
    let mut out = format!(
        "{}\n  by {} | {} | id {}\n  thumbnail: {}",
        preview.title, preview.uploader, preview.duration, preview.video, preview.thumbnail_url
    );
    if preview.options.is_empty() {
        out.push_str("\n  no downloadable streams");
    }
    for option in &preview.options {
        out.push_str("\n  - ");
        out.push_str(&option.label);
    }
    out
}

/// User-facing error text, with a hint when the cause is recognisable
pub fn render_error(error: &DownloadError, proxy: Option<&str>) -> String {
    let mut message = format!("Error: {}", error);

    match error {
        DownloadError::ToolNotFound(_) => {
            message.push_str("\nInstall yt-dlp (https://github.com/yt-dlp/yt-dlp) or set VIDEO_SAVER_YTDLP.");
        }
        DownloadError::Network(text) | DownloadError::Service(text) | DownloadError::NotFound(text) => {
            if let Some(reason) = diagnose_error(text) {
                message.push_str(&format!("\n\n{}\n{}", reason.description(), reason.suggestion(proxy)));
                if reason.proxy_might_help() && proxy.is_none() {
                    message.push_str("\nNo proxy is configured; --proxy or VIDEO_SAVER_PROXY may get around this.");
                }
            }
        }
        _ => {}
    }

    message
}
