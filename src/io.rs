use std::{io::ErrorKind, path::Path};

use miette::{miette, Context, IntoDiagnostic};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::result::Result;

/// Container format of every artifact this tool produces.
pub const CLIP_EXT: &str = "mp4";

const SCRATCH_PREFIX: &str = "vclip-src-";

/// Create the scratch file receiving the downloaded source video.
///
/// The handle is the cleanup guarantee: dropping it deletes the file,
/// on every exit path including panics. **Do not extract the path and
/// drop the handle.**
pub fn scratch_file() -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(&format!(".{CLIP_EXT}"))
        .tempfile()
        .into_diagnostic()
        .wrap_err("Could not create scratch file")?;

    debug!("scratch file at {}", file.path().display());
    Ok(file)
}

/// Delete the scratch file, logging instead of failing.
///
/// A cleanup failure must never replace the primary pipeline result, so
/// this returns nothing. A file already gone counts as cleaned up.
pub fn release_scratch(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    match file.close() {
        Ok(()) => debug!("scratch file {} removed", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!("could not remove scratch file {}: {err}", path.display()),
    }
}

/// Remove a possibly-absent partial output left by a failed cut.
pub fn discard_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("partial output {} removed", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!("could not remove partial output {}: {err}", path.display()),
    }
}

/// Build a clip file name that cannot collide with any other request,
/// including one allocated in the same process tick.
pub fn unique_clip_name() -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    format!("clip-{now}-{:016x}.{CLIP_EXT}", fastrand::u64(..))
}

/// Render the reference clients use to fetch a finished clip.
pub fn public_ref(prefix: &str, clip_name: &str) -> Result<String> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Err(miette!("public prefix must not be empty").into());
    }
    Ok(format!("{prefix}/{clip_name}"))
}
