use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    io,
    outside::{StreamCutter, VideoDownloader},
    result::Result,
    types::{ClipRequest, RawClipRequest},
};

/// One clip request, from raw input to a public reference.
///
/// Per request the flow is linear with no cycles: validate, allocate
/// paths, download the source into a private scratch file, cut the
/// requested window into the public clips directory, then release the
/// scratch file. The release runs on every exit path; the scratch
/// handle itself is the backstop for the paths this code cannot reach.
#[derive(Debug)]
pub struct ClipPipeline<'a> {
    downloader: &'a dyn VideoDownloader,
    cutter: &'a dyn StreamCutter,
    clips_dir: &'a Path,
    public_prefix: &'a str,
}

impl<'a> ClipPipeline<'a> {
    pub fn new(
        downloader: &'a dyn VideoDownloader,
        cutter: &'a dyn StreamCutter,
        clips_dir: &'a Path,
        public_prefix: &'a str,
    ) -> Self {
        Self {
            downloader,
            cutter,
            clips_dir,
            public_prefix,
        }
    }

    /// Run the whole pipeline for one request.
    ///
    /// Returns the public reference of the finished clip. A failed
    /// request leaves nothing behind and must be reissued from scratch
    /// by the caller; there are no retries and no partial resume.
    pub fn run(&self, raw: &RawClipRequest) -> Result<String> {
        // Nothing has touched the filesystem before this point
        let request = ClipRequest::validate(raw)?;
        debug!("validated range {} - {}", request.start, request.end);

        let scratch = io::scratch_file()?;
        let clip_name = io::unique_clip_name();
        let output = self.clips_dir.join(&clip_name);

        let res = self.download_and_cut(&request, scratch.path(), &output);
        io::release_scratch(scratch);

        res?;
        io::public_ref(self.public_prefix, &clip_name)
    }

    fn download_and_cut(&self, request: &ClipRequest, scratch: &Path, output: &Path) -> Result<()> {
        let info = self
            .downloader
            .probe_source(&request.url)
            .map_err(|err| {
                err.wrap_err_with(|| "Could not resolve the source metadata")
                    .into_acquisition()
            })?;
        info!("source resolved: '{}'", info.title);

        if let Some(duration) = info.duration {
            if u64::from(request.end.total_seconds()) > duration {
                warn!(
                    "requested end {} is past the end of the source ({duration}s), \
                        the clip will stop early",
                    request.end
                );
            }
        }

        info!("downloading source video");
        self.downloader
            .download_video(&request.url, scratch)
            .map_err(|err| {
                err.wrap_err_with(|| "Could not download the source video")
                    .into_acquisition()
            })?;

        info!("cutting {} - {}", request.start, request.end);
        if let Err(err) = self
            .cutter
            .cut_clip(scratch, output, request.start, request.end)
        {
            // A failed cut may leave a truncated container behind
            io::discard_partial(output);
            return Err(err
                .wrap_err_with(|| "Could not cut the requested range")
                .into_extraction());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        sync::Mutex,
    };

    use miette::miette;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        result::Error,
        types::{SourceInfo, Timestamp},
    };

    /// Downloader double. Records the scratch path it was handed so the
    /// tests can check it was cleaned up.
    #[derive(Debug, Default)]
    struct FakeDownloader {
        fail_probe: bool,
        fail_download: bool,
        scratch_seen: Mutex<Option<PathBuf>>,
    }

    impl VideoDownloader for FakeDownloader {
        fn probe_source(&self, _url: &str) -> crate::result::Result<SourceInfo> {
            if self.fail_probe {
                return Err(Error::Other(miette!("probe refused")));
            }
            Ok(SourceInfo {
                title: "a fake video".to_string(),
                duration: Some(3600),
            })
        }

        fn download_video(&self, _url: &str, dest: &Path) -> crate::result::Result<()> {
            *self.scratch_seen.lock().unwrap() = Some(dest.to_path_buf());
            if self.fail_download {
                return Err(Error::Other(miette!("download refused")));
            }
            std::fs::write(dest, b"fake mp4 bitstream").unwrap();
            Ok(())
        }
    }

    impl FakeDownloader {
        fn scratch_path(&self) -> Option<PathBuf> {
            self.scratch_seen.lock().unwrap().clone()
        }
    }

    /// Cutter double. On failure it leaves a partial output behind,
    /// like a crashed ffmpeg would.
    #[derive(Debug, Default)]
    struct FakeCutter {
        fail: bool,
    }

    impl StreamCutter for FakeCutter {
        fn cut_clip(
            &self,
            input: &Path,
            output: &Path,
            _start: Timestamp,
            _end: Timestamp,
        ) -> crate::result::Result<()> {
            assert!(input.exists(), "cut must run on the acquired file");
            if self.fail {
                std::fs::write(output, b"trunc").unwrap();
                return Err(Error::Other(miette!("cut refused")));
            }
            std::fs::copy(input, output).unwrap();
            Ok(())
        }
    }

    fn raw(start: &str, end: &str) -> RawClipRequest {
        RawClipRequest {
            url: "https://example.com/watch?v=1".to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn clips_in(dir: &TempDir) -> Vec<PathBuf> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn success_yields_a_public_ref_and_cleans_the_scratch_file() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let public_ref = pipeline.run(&raw("00:30", "01:15")).unwrap();

        assert!(public_ref.starts_with("/clips/clip-"));
        assert!(public_ref.ends_with(".mp4"));

        let produced = clips_in(&clips);
        assert_eq!(produced.len(), 1);
        assert_eq!(
            public_ref.rsplit('/').next().unwrap(),
            produced[0].file_name().unwrap().to_str().unwrap()
        );
        assert!(std::fs::metadata(&produced[0]).unwrap().len() > 0);

        let scratch = downloader.scratch_path().expect("download was invoked");
        assert!(!scratch.exists(), "scratch file must be removed");
    }

    #[test]
    fn a_one_second_clip_succeeds() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        pipeline.run(&raw("00:00", "00:01")).unwrap();
        assert_eq!(clips_in(&clips).len(), 1);
    }

    #[test]
    fn malformed_timestamps_never_reach_the_tools() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let err = pipeline.run(&raw("99:99", "01:15")).unwrap_err();

        assert_eq!(err.kind(), "validation");
        assert!(downloader.scratch_path().is_none(), "no tool invoked");
        assert!(clips_in(&clips).is_empty(), "no filesystem side effects");
    }

    #[test]
    fn a_reversed_range_never_reaches_the_tools() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let err = pipeline.run(&raw("01:15", "00:30")).unwrap_err();

        assert_eq!(err.kind(), "validation");
        assert!(downloader.scratch_path().is_none());
        assert!(clips_in(&clips).is_empty());
    }

    #[test]
    fn download_failure_leaves_nothing_behind() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader {
            fail_download: true,
            ..Default::default()
        };
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let err = pipeline.run(&raw("00:30", "01:15")).unwrap_err();

        assert_eq!(err.kind(), "acquisition");
        assert!(clips_in(&clips).is_empty());
        let scratch = downloader.scratch_path().unwrap();
        assert!(!scratch.exists());
    }

    #[test]
    fn probe_failure_is_an_acquisition_failure() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader {
            fail_probe: true,
            ..Default::default()
        };
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let err = pipeline.run(&raw("00:30", "01:15")).unwrap_err();

        assert_eq!(err.kind(), "acquisition");
        assert!(clips_in(&clips).is_empty());
    }

    #[test]
    fn cut_failure_removes_the_partial_output_and_the_scratch_file() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = FakeCutter { fail: true };
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let err = pipeline.run(&raw("00:30", "01:15")).unwrap_err();

        assert_eq!(err.kind(), "extraction");
        assert!(clips_in(&clips).is_empty(), "partial output must be removed");
        let scratch = downloader.scratch_path().unwrap();
        assert!(!scratch.exists());
    }

    #[test]
    fn timeouts_keep_their_own_kind() {
        #[derive(Debug)]
        struct TimingOutCutter;
        impl StreamCutter for TimingOutCutter {
            fn cut_clip(
                &self,
                _input: &Path,
                output: &Path,
                _start: Timestamp,
                _end: Timestamp,
            ) -> crate::result::Result<()> {
                std::fs::write(output, b"trunc").unwrap();
                Err(Error::Timeout {
                    program: "ffmpeg",
                    limit: std::time::Duration::from_secs(30),
                })
            }
        }

        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = TimingOutCutter;
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let err = pipeline.run(&raw("00:30", "01:15")).unwrap_err();

        assert_eq!(err.kind(), "timeout");
        assert!(clips_in(&clips).is_empty());
    }

    #[test]
    fn concurrent_requests_get_distinct_paths() {
        let clips = TempDir::new().unwrap();
        let downloader = FakeDownloader::default();
        let cutter = FakeCutter::default();
        let pipeline = ClipPipeline::new(&downloader, &cutter, clips.path(), "/clips");

        let refs: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| pipeline.run(&raw("00:30", "01:15")).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let distinct: std::collections::HashSet<&String> = refs.iter().collect();
        assert_eq!(distinct.len(), 4);
        assert_eq!(clips_in(&clips).len(), 4);
    }
}
