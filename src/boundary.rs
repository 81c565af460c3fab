use serde::Serialize;
use tracing::{error, info, warn};

use crate::{pipeline::ClipPipeline, result::Error, types::RawClipRequest};

/// Wire shape reported to the presentation layer.
///
/// Failures carry the error kind and a message safe for end users; the
/// full diagnostic only ever reaches the operator log.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ClipResponse {
    Success {
        message: String,
        #[serde(rename = "clipUrl")]
        clip_url: String,
    },
    Failure {
        #[serde(rename = "errorKind")]
        error_kind: String,
        error: String,
    },
}

impl ClipResponse {
    pub fn is_failure(&self) -> bool {
        matches!(self, ClipResponse::Failure { .. })
    }
}

/// The single operation the presentation layer invokes.
///
/// Runs one pipeline instance inside a span keyed by a short request
/// id, so concurrent requests stay distinguishable in the logs.
pub fn handle(pipeline: &ClipPipeline<'_>, raw: &RawClipRequest) -> ClipResponse {
    let request_id = format!("{:08x}", fastrand::u32(..));
    let span = tracing::info_span!("clip", request = %request_id);
    let _guard = span.enter();

    info!(url = %raw.url, start = %raw.start, end = %raw.end, "request received");

    match pipeline.run(raw) {
        Ok(clip_url) => {
            info!(%clip_url, "clip created");
            ClipResponse::Success {
                message: "Clip created successfully!".to_string(),
                clip_url,
            }
        }
        Err(err) => {
            let response = ClipResponse::Failure {
                error_kind: err.kind().to_string(),
                error: err.public_message(),
            };

            match err {
                Error::Validation(msg) => warn!("rejected request: {msg}"),
                err => {
                    let report: miette::Report = err.into();
                    error!("request failed: {report:?}");
                }
            }

            response
        }
    }
}
