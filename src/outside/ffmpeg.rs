use std::{ffi::OsStr, fmt::Debug, path::Path, time::Duration};

use crate::{result::Result, types::Timestamp};

use super::command::{assert_success_command, FFMPEG, FFMPEG_DEFAULT_ARGS};

/// Interface for cutting a time window out of a local media file.
pub trait StreamCutter: Sync + Debug {
    /// Write the `[start, end)` window of `input` to `output`,
    /// preserving the original bitstream.
    ///
    /// Stream copy cuts the video on keyframe boundaries, so the actual
    /// start may precede the requested one by up to one keyframe
    /// interval. The cut never extends past `end`.
    fn cut_clip(&self, input: &Path, output: &Path, start: Timestamp, end: Timestamp)
        -> Result<()>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
#[derive(Debug)]
pub struct Ffmpeg {
    deadline: Option<Duration>,
}

impl Ffmpeg {
    /// Verify that the `ffmpeg` binary is reachable
    pub fn new(deadline: Option<Duration>) -> Result<Self> {
        assert_success_command(FFMPEG, |cmd| cmd.arg("-version"), deadline)?;

        Ok(Self { deadline })
    }
}

impl StreamCutter for Ffmpeg {
    fn cut_clip(
        &self,
        input: &Path,
        output: &Path,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<()> {
        // `-c copy` repackages the encoded frames as-is. Re-encoding is
        // what makes cutting slow and lossy, so there is deliberately no
        // fallback to it here.
        assert_success_command(
            FFMPEG,
            |cmd| {
                cmd.args(FFMPEG_DEFAULT_ARGS)
                    .arg("-y")
                    .args([OsStr::new("-i"), input.as_os_str()])
                    .args(["-ss", &start.to_string()])
                    .args(["-to", &end.to_string()])
                    .args(["-c", "copy"])
                    .args(["-avoid_negative_ts", "make_zero"])
                    .arg(output)
            },
            self.deadline,
        )
    }
}
