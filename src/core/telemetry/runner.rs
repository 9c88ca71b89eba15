use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ExecutionError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a subprocess that exited with status zero.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Resolve an executable name against the PATH.
///
/// Names that already contain a path separator are taken as-is so a
/// configured absolute path bypasses the lookup.
pub fn resolve_binary(name: &str) -> Result<PathBuf, ExecutionError> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return Ok(candidate.to_path_buf());
    }
    which::which(name).map_err(|_| ExecutionError::NotFound {
        command: name.to_string(),
    })
}

/// Run `command` with `args`, capturing stdout/stderr, failing if the child
/// has not exited within `timeout`.
///
/// A timed-out child is killed and reaped before this returns; no zombie is
/// left behind. Retrying is the caller's concern, not this layer's.
pub fn run(command: &Path, args: &[&str], timeout: Duration) -> Result<Outcome, ExecutionError> {
    let display = command.display().to_string();

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ExecutionError::NotFound {
                command: display.clone(),
            },
            _ => ExecutionError::Spawn {
                command: display.clone(),
                source: err,
            },
        })?;

    // Drain both pipes on separate threads so a chatty child cannot fill a
    // pipe buffer and stall while we poll for exit.
    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout) {
        Some(status) => status,
        None => {
            log::warn!("'{}' exceeded {:?}, killing", display, timeout);
            let _ = child.kill();
            let _ = child.wait();
            join_reader(stdout_reader);
            join_reader(stderr_reader);
            return Err(ExecutionError::TimedOut {
                command: display,
                timeout,
            });
        }
    };

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    if !status.success() {
        return Err(ExecutionError::NonZeroExit {
            command: display,
            code: status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(Outcome {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(0),
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                log::error!("try_wait failed: {}", err);
                return None;
            }
        }
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<thread::JoinHandle<String>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = reader.read_to_string(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
