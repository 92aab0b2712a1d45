// Helper functions for backend implementations

use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use crate::config::NetworkConfig;
use crate::downloader::errors::DownloadError;

/// Run command with timeout (shared utility)
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Service(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Service(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res
                .map_err(|e| DownloadError::Service(format!("Failed to wait for {}: {}", program, e)))?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Network(format!(
                "{} timed out after {}s",
                program, timeout_secs
            )))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::Service(format!("{} task failed: {}", name, e)))?
        .map_err(|e| DownloadError::Service(format!("Failed to read {}: {}", name, e)))
}

/// Map a spawn failure to a tool-not-found or service error
pub fn spawn_error(program: &str, e: &std::io::Error) -> DownloadError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DownloadError::ToolNotFound(format!("{}: {}", program, e))
    } else {
        DownloadError::Service(format!("Failed to start {}: {}", program, e))
    }
}

/// Find yt-dlp executable in common paths
pub fn find_ytdlp() -> String {
    find_binary("yt-dlp").unwrap_or_else(|| "yt-dlp".to_string())
}

/// Locate a binary in well-known install locations, then PATH
pub fn find_binary(name: &str) -> Option<String> {
    let common_paths = [
        format!("/opt/homebrew/bin/{}", name),
        format!("/usr/local/bin/{}", name),
        format!("/usr/bin/{}", name),
    ];

    for path in common_paths {
        if Path::new(&path).exists() {
            return Some(path);
        }
    }

    let locator = if cfg!(windows) { "where" } else { "which" };
    let output = StdCommand::new(locator).arg(name).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()?
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(timeout) = config.timeout {
        args.push("--socket-timeout".to_string());
        args.push(timeout.to_string());
    }

    args
}

/// Check that `dir` exists and a file can be created in it
pub async fn ensure_writable_dir(dir: &Path) -> Result<(), DownloadError> {
    let meta = tokio::fs::metadata(dir)
        .await
        .map_err(|e| DownloadError::io(dir, &e))?;
    if !meta.is_dir() {
        let e = std::io::Error::new(std::io::ErrorKind::Other, "not a directory");
        return Err(DownloadError::io(dir, &e));
    }

    let probe = dir.join(format!(".video-saver-probe-{}", std::process::id()));
    tokio::fs::write(&probe, b"")
        .await
        .map_err(|e| DownloadError::io(dir, &e))?;
    let _ = tokio::fs::remove_file(&probe).await;
    Ok(())
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `<dir>/<sanitized title>.<ext>`, falling back to "video" for empty titles
pub fn file_path_for(dir: &Path, title: &str, extension: &str) -> PathBuf {
    let mut stem = sanitize_filename(title);
    if stem.is_empty() {
        stem = "video".to_string();
    }
    dir.join(format!("{}.{}", stem, extension))
}
