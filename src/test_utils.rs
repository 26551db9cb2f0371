//! Shared test utilities for the pipeline crate.

use crate::executor::{CommandExecutor, CommandSpec};
use camino::Utf8PathBuf;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// A temporary directory with a UTF-8 path.
pub struct TempTree {
    _temp: TempDir,
    /// Root of the temporary tree.
    pub root: Utf8PathBuf,
}

impl TempTree {
    /// Create an empty temporary tree.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("temp dir is not UTF-8");
        Self { _temp: temp, root }
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent");
        }
        std::fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Create the directory `relative` and its parents.
    pub fn mkdir(&self, relative: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(&path).expect("failed to create dir");
        path
    }
}

/// Executor that records every invocation and answers with a closure.
///
/// Unlike the mockall mock it is `Sync` without expectations, so it can be
/// shared across packaging worker threads.
pub struct RecordingExecutor<F> {
    calls: Mutex<Vec<CommandSpec>>,
    respond: F,
}

impl<F> RecordingExecutor<F>
where
    F: Fn(&CommandSpec) -> std::io::Result<Output> + Send + Sync,
{
    /// Create an executor that answers each call with `respond`.
    pub fn new(respond: F) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond,
        }
    }

    /// Snapshot of the recorded invocations, in call order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

impl<F> CommandExecutor for RecordingExecutor<F>
where
    F: Fn(&CommandSpec) -> std::io::Result<Output> + Send + Sync,
{
    fn run(&self, spec: &CommandSpec) -> std::io::Result<Output> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(spec.clone());
        (self.respond)(spec)
    }
}
