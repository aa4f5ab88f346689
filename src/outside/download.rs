use std::{ffi::OsStr, path::Path};

use tracing::{debug, warn};

use super::command::{run_command, Capture, YT_DL, YT_DLP};
use crate::types::Extension;

const YOU_GET: &str = "you-get";

/// Result of one download attempt.
///
/// The download boundary never raises: any failure is caught and converted
/// into `Failed` with a classified reason, so callers can account for the
/// cause instead of a bare boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(FailureKind),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The tool reported a connectivity problem
    Network,
    /// The platform returned a stream the tool cannot handle
    UnsupportedFormat,
    /// Anything else, with the first stderr line as diagnostic
    Backend(String),
}

/// Interface for materializing one video file
pub trait VideoDownloader {
    /// Download `url` into `dir` as `<stem><ext>`.
    ///
    /// Must never panic or error out: a failed attempt is reported through
    /// the returned [`Outcome`].
    fn download(&self, url: &str, stem: &str, ext: Extension, dir: &Path) -> Outcome;
}

/// A single external download engine, invoked `youtube-dl`-style
struct Engine {
    program: &'static str,
}

impl Engine {
    fn run(&self, url: &str, out: &Path) -> Outcome {
        let res = run_command(
            self.program,
            |cmd| {
                cmd.arg("-q")
                    .args([OsStr::new("-o"), out.as_os_str()])
                    .args(["-f", "best"])
                    // Or else fails when the file already exists, even an empty one
                    .arg("--no-continue")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDERR,
        );

        match res {
            Ok(output) if output.status.success() => Outcome::Completed,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Outcome::Failed(classify_stderr(&stderr))
            }
            Err(report) => {
                warn!("Could not run {}: {report}", self.program);
                Outcome::Failed(FailureKind::Backend(format!(
                    "could not run {}",
                    self.program
                )))
            }
        }
    }
}

/// YouTube downloads, layered over an ordered list of engines tried in
/// sequence (`yt-dlp` first, then `youtube-dl`). The whole list is
/// exhausted before a failure is reported.
pub struct YoutubeDownloader {
    engines: Vec<Engine>,
}

impl YoutubeDownloader {
    pub fn new() -> Self {
        Self {
            engines: vec![Engine { program: YT_DLP }, Engine { program: YT_DL }],
        }
    }
}

impl VideoDownloader for YoutubeDownloader {
    fn download(&self, url: &str, stem: &str, ext: Extension, dir: &Path) -> Outcome {
        let out = dir.join(format!("{stem}{}", ext.with_dot()));
        let mut last = Outcome::Failed(FailureKind::Backend("no engine available".to_string()));

        for engine in &self.engines {
            debug!("Trying {} for {url}", engine.program);
            last = engine.run(url, &out);
            if last.is_completed() {
                return last;
            }
            warn!("{} failed for {url}", engine.program);
        }

        last
    }
}

/// Bilibili downloads, shelled out to the `you-get` binary.
///
/// `you-get` picks the container itself, so the requested extension is
/// only a hint here; the fetcher matches files on their stem anyway.
pub struct BilibiliDownloader;

impl VideoDownloader for BilibiliDownloader {
    fn download(&self, url: &str, stem: &str, _ext: Extension, dir: &Path) -> Outcome {
        let res = run_command(
            YOU_GET,
            |cmd| {
                cmd.args([OsStr::new("-o"), dir.as_os_str()])
                    .args(["-O", stem])
                    .arg("--")
                    .arg(url)
            },
            Capture::STDERR,
        );

        match res {
            Ok(output) if output.status.success() => Outcome::Completed,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Outcome::Failed(classify_stderr(&stderr))
            }
            Err(report) => {
                warn!("Could not run {YOU_GET}: {report}");
                Outcome::Failed(FailureKind::Backend(format!("could not run {YOU_GET}")))
            }
        }
    }
}

/// Map a tool's stderr onto a failure reason.
///
/// Best-effort string matching on the error lines the downloaders are
/// known to emit.
fn classify_stderr(stderr: &str) -> FailureKind {
    let lowered = stderr.to_lowercase();

    let unsupported = [
        "unsupported url",
        "unsupported format",
        "requested format is not available",
    ];
    let network = ["network", "timed out", "connection", "unable to download"];

    if unsupported.iter().any(|pat| lowered.contains(pat)) {
        FailureKind::UnsupportedFormat
    } else if network.iter().any(|pat| lowered.contains(pat)) {
        FailureKind::Network
    } else {
        let line = stderr
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("unknown error");
        FailureKind::Backend(line.trim().to_string())
    }
}
