use std::fmt::Display;
use std::time::Duration;

use miette::miette;

/// Per-request failure, classified for the boundary.
///
/// Tool diagnostics live inside the reports and are only ever shown to
/// the operator; the boundary exposes [`Error::public_message`] instead.
#[derive(Debug)]
pub enum Error {
    /// Malformed request. The message is user-actionable and shown verbatim.
    Validation(String),

    /// The external fetch failed (network, unavailable source, no format).
    Acquisition(miette::Report),

    /// The external cut failed (corrupt input, bad offsets, tool crash).
    Extraction(miette::Report),

    /// An external tool exceeded its configured deadline and was killed.
    Timeout {
        program: &'static str,
        limit: Duration,
    },

    /// Anything else (scratch allocation, spawn failure, ...).
    Other(miette::Report),
}

impl Error {
    /// Stable kind identifier reported to the caller.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Acquisition(_) => "acquisition",
            Error::Extraction(_) => "extraction",
            Error::Timeout { .. } => "timeout",
            Error::Other(_) => "internal",
        }
    }

    /// Message safe to show to the end user.
    ///
    /// Never contains tool output. Validation messages pass through as
    /// they describe the user's own input.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::Acquisition(_) => "Could not download the source video.".to_string(),
            Error::Extraction(_) => "Could not cut the requested clip.".to_string(),
            Error::Timeout { limit, .. } => {
                format!("The operation did not finish within {}s.", limit.as_secs())
            }
            Error::Other(_) => "An internal error occurred.".to_string(),
        }
    }

    /// Classify an error raised while acquiring the source.
    ///
    /// Timeouts and validation failures keep their own kind.
    pub fn into_acquisition(self) -> Self {
        match self {
            Error::Other(report) => Error::Acquisition(report),
            err => err,
        }
    }

    /// Classify an error raised while cutting the clip.
    pub fn into_extraction(self) -> Self {
        match self {
            Error::Other(report) => Error::Extraction(report),
            err => err,
        }
    }

    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Acquisition(report) => Error::Acquisition(report.wrap_err(f())),
            Error::Extraction(report) => Error::Extraction(report.wrap_err(f())),
            Error::Other(report) => Error::Other(report.wrap_err(f())),
            err => err,
        }
    }
}

impl From<miette::Report> for Error {
    fn from(report: miette::Report) -> Self {
        Error::Other(report)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(miette!("{err}"))
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => miette!("Invalid request: {msg}"),
            Error::Acquisition(report) => report.wrap_err("Could not acquire the source video"),
            Error::Extraction(report) => report.wrap_err("Could not extract the requested range"),
            Error::Timeout { program, limit } => {
                miette!("`{program}` did not finish within {}s", limit.as_secs())
            }
            Error::Other(report) => report,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
