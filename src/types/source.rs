/// Metadata of the source video, as reported by the fetch tool before
/// downloading anything.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub title: String,

    /// Stream length in seconds. Unknown for some live or still-processing
    /// sources.
    pub duration: Option<u64>,
}
