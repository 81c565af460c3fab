use std::{path::PathBuf, time::Duration};

use clap::Parser;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("VCLIP_", $v)
    };
}

/// Wrapper-tool around `yt-dlp` and `ffmpeg` to cut a clip out of a web
/// video. Download the source, cut the requested range without
/// re-encoding, and store the result under a web-servable directory.
#[derive(Parser, Debug)]
pub struct Args {
    /// The URL of the source video
    pub url: String,

    /// Where the clip starts, as MM:SS
    pub start: String,

    /// Where the clip ends, as MM:SS
    pub end: String,

    /// The web-servable directory where finished clips are stored
    #[arg(long, default_value = "public/clips", env = arg_env!("CLIPS_DIR"))]
    pub clips_dir: PathBuf,

    /// The URL prefix under which the clips directory is served
    #[arg(long, default_value = "/clips", env = arg_env!("PUBLIC_PREFIX"))]
    pub public_prefix: String,

    /// Kill an external tool and fail the request if one invocation
    /// runs longer than this many seconds
    #[arg(long, env = arg_env!("TOOL_TIMEOUT"))]
    pub tool_timeout: Option<u64>,

    /// Print debug logs
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    pub fn tool_deadline(&self) -> Option<Duration> {
        self.tool_timeout.map(Duration::from_secs)
    }
}
