//! External process execution.
//!
//! Every tool the pipeline drives (minifiers, the dependency installer, the
//! packager) is launched through [`CommandExecutor`] so tests can substitute
//! canned outputs for real processes.

use crate::error::ToolError;
use camino::{Utf8Path, Utf8PathBuf};
use log::trace;
use std::fmt;
use std::process::{Command, Output};

/// A fully described process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory; inherits the current directory when `None`.
    pub cwd: Option<Utf8PathBuf>,
}

impl CommandSpec {
    /// Describe an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir` instead of the current directory.
    #[must_use]
    pub fn current_dir(mut self, dir: &Utf8Path) -> Self {
        self.cwd = Some(dir.to_owned());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor: Send + Sync {
    /// Runs the command and returns its captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// process.
    fn run(&self, spec: &CommandSpec) -> std::io::Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use stagehand::executor::{CommandExecutor, CommandSpec, SystemCommandExecutor};
///
/// let output = SystemCommandExecutor.run(&CommandSpec::new("npm").arg("--version"))?;
/// assert!(output.status.success());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<Output> {
        trace!("running {spec}");
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.output()
    }
}

/// Run `spec` and convert launch failures and unsuccessful exits into
/// [`ToolError`]s.
///
/// # Errors
///
/// Returns [`ToolError::Launch`] when the process cannot be started and
/// [`ToolError::Failed`] when it exits unsuccessfully.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    spec: &CommandSpec,
) -> Result<Output, ToolError> {
    let output = executor.run(spec).map_err(|source| ToolError::Launch {
        program: spec.program.clone(),
        source,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::Failed {
            program: spec.program.clone(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_owned(),
        });
    }

    Ok(output)
}
