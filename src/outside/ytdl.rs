use std::{
    ffi::OsStr,
    fmt::Debug,
    path::Path,
    process::{Command, Output},
    time::Duration,
};

use miette::{miette, Context, IntoDiagnostic};

use super::command::{
    assert_success_command, command_failed, run_command, Capture, YT_DL, YT_DLP,
};
use crate::{
    result::{Error, Result},
    types::SourceInfo,
};

/// Ordered format fallback passed to the fetch tool.
///
/// Separate best-quality mp4 video + m4a audio when the source exposes
/// them, else the best pre-muxed mp4, else whatever the source has.
/// A source without the ideal format must still resolve.
const FORMAT_PREFERENCE: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Interface for resolving and downloading the source video.
pub trait VideoDownloader: Sync + Debug {
    /// Look up the source metadata without downloading anything.
    fn probe_source(&self, url: &str) -> Result<SourceInfo>;

    /// Materialize the source video at `dest`.
    ///
    /// Writes exactly one file at `dest` on success. On failure the
    /// file state is indeterminate and the caller's cleanup must
    /// tolerate either outcome.
    fn download_video(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program,
/// falling back to its `youtube-dl` ancestor.
#[derive(Debug)]
pub struct Ytdl {
    program: &'static str,
    deadline: Option<Duration>,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new(deadline: Option<Duration>) -> Result<Self> {
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version"), deadline).is_ok() {
            Ok(Self {
                program: YT_DLP,
                deadline,
            })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version"), deadline).is_ok() {
            Ok(Self {
                program: YT_DL,
                deadline,
            })
        } else {
            Err(Error::Other(miette!(
                "Neither yt-dlp nor youtube-dl found"
            )))
        }
    }

    /// Run the command, turning a "stream unavailable" complaint on
    /// stderr into a clearer diagnostic than the raw exit status.
    fn run_checked<F>(&self, f: F, capture: Capture) -> Result<Output>
    where
        F: FnOnce(&mut Command) -> &mut Command,
    {
        let res = run_command(self.program, f, capture | Capture::STDERR, self.deadline)?;

        let stderr = String::from_utf8_lossy(&res.stderr);
        let is_unavailable = stderr
            .lines()
            .any(|line| line.starts_with("ERROR:") && line.to_lowercase().contains("unavailable"));
        if is_unavailable {
            return Err(Error::Other(miette!("Source video is unavailable")));
        }

        if res.status.success() {
            Ok(res)
        } else {
            Err(command_failed(self.program, &res))
        }
    }
}

impl VideoDownloader for Ytdl {
    fn probe_source(&self, url: &str) -> Result<SourceInfo> {
        let res = self.run_checked(
            |cmd| {
                cmd.arg("-q")
                    .arg("--skip-download")
                    .arg("--no-playlist")
                    .arg("-j")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT,
        )?;
        let output = String::from_utf8_lossy(&res.stdout);

        let json = serde_json::from_str::<serde_json::Value>(&output)
            .into_diagnostic()
            .wrap_err("Could not parse metadata JSON")?;
        let json = json.as_object().ok_or(miette!("Metadata JSON is not an object"))?;

        let title = json
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or(miette!("Key 'title' not found in metadata JSON"))?
            .to_owned();

        // Absent for some live or still-processing sources
        let duration = json.get("duration").and_then(|v| v.as_u64());

        Ok(SourceInfo { title, duration })
    }

    fn download_video(&self, url: &str, dest: &Path) -> Result<()> {
        self.run_checked(
            |cmd| {
                cmd.arg("-q")
                    .args([OsStr::new("-o"), dest.as_os_str()])
                    .arg("--no-continue") // Or else fails when file already exists, even an empty one
                    .arg("--no-playlist") // Exactly one file at dest, even for playlist URLs
                    .args(["-f", FORMAT_PREFERENCE])
                    .arg("--")
                    .arg(url)
            },
            Capture::empty(),
        )?;

        Ok(())
    }
}
