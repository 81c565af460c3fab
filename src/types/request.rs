use crate::result::{Error, Result};

use super::Timestamp;

/// Untrusted boundary input, exactly as the caller sent it.
#[derive(Debug, Clone)]
pub struct RawClipRequest {
    pub url: String,
    pub start: String,
    pub end: String,
}

/// A validated clip request. Immutable for the lifetime of one
/// pipeline run.
#[derive(Debug)]
pub struct ClipRequest {
    pub url: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ClipRequest {
    /// Validate the raw request.
    ///
    /// The ordering check is separate from the per-field format checks
    /// so the two failure messages stay distinct: fixing the format and
    /// fixing the ordering are different user actions.
    pub fn validate(raw: &RawClipRequest) -> Result<Self> {
        if raw.url.trim().is_empty() {
            return Err(Error::Validation("missing source URL".to_string()));
        }

        let start: Timestamp = raw.start.parse()?;
        let end: Timestamp = raw.end.parse()?;

        if start >= end {
            return Err(Error::Validation(format!(
                "end ({end}) must be after start ({start})"
            )));
        }

        Ok(Self {
            url: raw.url.clone(),
            start,
            end,
        })
    }
}
