mod request;
mod source;
mod timestamp;

pub use request::{ClipRequest, RawClipRequest};
pub use source::SourceInfo;
pub use timestamp::Timestamp;
