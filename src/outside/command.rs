use std::{
    io::Read,
    process::{Command, Output, Stdio},
    thread,
    time::{Duration, Instant},
};

use bitflags::bitflags;
use miette::{miette, Context, IntoDiagnostic};
use tracing::{debug, trace};

use crate::result::{Error, Result};

pub const YT_DLP: &str = "yt-dlp";
pub const YT_DL: &str = "youtube-dl";
pub const FFMPEG: &str = "ffmpeg";
pub const FFMPEG_DEFAULT_ARGS: [&str; 3] = ["-hide_banner", "-loglevel", "error"];

/// How often a child with a deadline is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

bitflags! {
    pub struct Capture: u8 {
        const STDIN = 0b0000001;
        const STDOUT = 0b0000010;
        const STDERR = 0b0000100;
    }
}

/// Run a command, returning its raw output handle.
///
/// Arguments are always passed as a vector, never through a shell, so
/// caller-provided values (URLs, timestamps) cannot be reinterpreted.
///
/// IO handles are captured only if the caller asked for them or if the
/// log level is Debug; in that last case `stdout` and `stderr` are logged.
///
/// With a deadline set, a child still running when it expires is killed
/// and reported as [`Error::Timeout`]. A non-0 exit status is not an
/// error at this layer; callers inspect the status themselves.
pub fn run_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &'static str,
    f: F,
    capture: Capture,
    deadline: Option<Duration>,
) -> Result<Output> {
    let is_debug = tracing::enabled!(tracing::Level::DEBUG);
    let get_io = |capture| {
        if capture {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    };

    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(get_io(capture.contains(Capture::STDIN)))
        .stdout(get_io(is_debug || capture.contains(Capture::STDOUT)))
        .stderr(get_io(is_debug || capture.contains(Capture::STDERR)));

    debug!("executing command: {cmd:?}");
    let res = match deadline {
        None => cmd
            .output()
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not execute `{program}`"))?,
        Some(limit) => output_within(program, cmd, limit)?,
    };

    if is_debug {
        debug!("status: {}", res.status);
        debug!("stdout: {} bytes long", res.stdout.len());
        trace!("stdout: {:?}", String::from_utf8_lossy(&res.stdout));
        debug!("stderr: {} bytes long", res.stderr.len());
        trace!("stderr: {:?}", String::from_utf8_lossy(&res.stderr));
    }

    Ok(res)
}

/// Run the command and verify that it has returned a success status code.
///
/// On a non-0 status, the tail of the captured stderr is attached to the
/// error so the diagnostic survives into the operator log.
pub fn assert_success_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &'static str,
    f: F,
    deadline: Option<Duration>,
) -> Result<()> {
    let res = run_command(program, f, Capture::STDERR, deadline)?;
    if res.status.success() {
        Ok(())
    } else {
        Err(command_failed(program, &res))
    }
}

/// Build the error for a command that ran but exited unsuccessfully.
pub fn command_failed(program: &'static str, output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Error::Other(miette!("`{program}` exited with {}", output.status))
    } else {
        Error::Other(miette!(
            "`{program}` exited with {}: {stderr}",
            output.status
        ))
    }
}

/// Like [`Command::output`], but kill the child once the limit expires.
fn output_within(program: &'static str, cmd: &mut Command, limit: Duration) -> Result<Output> {
    let mut child = cmd
        .spawn()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not execute `{program}`"))?;

    // Drain the pipes from separate threads so a chatty child cannot
    // fill a pipe buffer and block forever.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let expires = Instant::now() + limit;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => return Err(Error::Other(miette!("Could not wait on `{program}`: {err}"))),
        }

        if Instant::now() >= expires {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                program,
                limit,
            });
        }

        thread::sleep(POLL_INTERVAL);
    };

    let join = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default()
    };

    Ok(Output {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}
