mod command;
mod ffmpeg;
mod ytdl;

pub use ffmpeg::{Ffmpeg, StreamCutter};
pub use ytdl::{VideoDownloader, Ytdl};
