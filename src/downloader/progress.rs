// yt-dlp output line parsing

use regex::Regex;

use super::models::DownloadProgress;

lazy_static::lazy_static! {
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+/s))?(?:\s+ETA\s+(\S+))?"
    ).unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"\[download\]\s+(.+) has already been downloaded").unwrap();
    static ref EXTRACT_AUDIO_RE: Regex = Regex::new(r"\[ExtractAudio\]\s+Destination:\s+(.+)").unwrap();
}

/// Prefix marking the final file path printed by `--print after_move:...`
pub const SAVED_MARKER: &str = "SAVED:";

/// One interesting line of yt-dlp output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Progress(DownloadProgress),
    /// yt-dlp announced where it is writing
    Destination(String),
    /// The file was already present and was skipped
    AlreadyDownloaded(String),
    /// Final path after all post-processing
    Saved(String),
}

/// Parse a line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32
pub fn parse_output_line(line: &str) -> Option<OutputEvent> {
    let line = line.trim();

    if let Some(path) = line.strip_prefix(SAVED_MARKER) {
        return Some(OutputEvent::Saved(path.trim().to_string()));
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str());
        let eta = caps.get(4).map(|m| m.as_str());

        let status = match (speed, eta) {
            (Some(speed), Some(eta)) => format!("{:.1}% of {} @ {} ETA {}", percent, size, speed, eta),
            (Some(speed), None) => format!("{:.1}% of {} @ {}", percent, size, speed),
            _ => format!("{:.1}% of {}", percent, size),
        };
        return Some(OutputEvent::Progress(DownloadProgress { percent, status }));
    }

    if let Some(caps) = EXTRACT_AUDIO_RE.captures(line) {
        return Some(OutputEvent::Destination(caps[1].trim().to_string()));
    }

    if let Some(caps) = DEST_RE.captures(line) {
        return Some(OutputEvent::Destination(caps[1].trim().to_string()));
    }

    if let Some(caps) = ALREADY_RE.captures(line) {
        return Some(OutputEvent::AlreadyDownloaded(caps[1].trim().to_string()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_with_speed_and_eta() {
        let line = "[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)";
        match parse_output_line(line) {
            Some(OutputEvent::Progress(p)) => {
                assert!((p.percent - 12.5).abs() < f32::EPSILON);
                assert_eq!(p.status, "12.5% of 310.04MiB @ 374.36KiB/s ETA 11:59");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn parses_finished_progress() {
        let line = "[download] 100% of   12.34MiB in 00:00:03 at 3.90MiB/s";
        match parse_output_line(line) {
            Some(OutputEvent::Progress(p)) => assert!((p.percent - 100.0).abs() < f32::EPSILON),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn parses_destination() {
        let line = "[download] Destination: /home/u/Downloads/Some Title.mp4";
        assert_eq!(
            parse_output_line(line),
            Some(OutputEvent::Destination("/home/u/Downloads/Some Title.mp4".to_string()))
        );
    }

    #[test]
    fn parses_already_downloaded() {
        let line = "[download] /home/u/Downloads/Some Title.m4a has already been downloaded";
        assert_eq!(
            parse_output_line(line),
            Some(OutputEvent::AlreadyDownloaded("/home/u/Downloads/Some Title.m4a".to_string()))
        );
    }

    #[test]
    fn parses_saved_marker() {
        assert_eq!(
            parse_output_line("SAVED:/tmp/x/Title.mp4"),
            Some(OutputEvent::Saved("/tmp/x/Title.mp4".to_string()))
        );
    }

    #[test]
    fn ignores_noise() {
        assert_eq!(parse_output_line("[youtube] abc: Downloading webpage"), None);
    }
}
