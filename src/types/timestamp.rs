use std::{fmt::Display, str::FromStr, sync::OnceLock};

use regex::Regex;

use crate::result::Error;

/// A position inside the source video, parsed from `MM:SS`.
///
/// Minutes may be written with one or two digits, seconds always with
/// two. Both components are capped at 59, so the representable range is
/// `00:00` to `59:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    minutes: u8,
    seconds: u8,
}

static TIMESTAMP_RE: OnceLock<Regex> = OnceLock::new();

fn timestamp_re() -> &'static Regex {
    TIMESTAMP_RE.get_or_init(|| Regex::new(r"^([0-5]?\d):([0-5]\d)$").unwrap())
}

impl Timestamp {
    /// Total number of seconds since `00:00`.
    pub fn total_seconds(self) -> u32 {
        u32::from(self.minutes) * 60 + u32::from(self.seconds)
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = timestamp_re().captures(s).ok_or_else(|| {
            Error::Validation(format!(
                "invalid timestamp '{s}': expected MM:SS with minutes and seconds between 00 and 59"
            ))
        })?;

        // The pattern only matches 1-2 digit numbers up to 59
        let minutes = caps[1].parse().unwrap();
        let seconds = caps[2].parse().unwrap();

        Ok(Self { minutes, seconds })
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // ffmpeg accepts this back as a string-formatted offset
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}
