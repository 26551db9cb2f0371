//! stagehand CLI entrypoint.
//!
//! This binary packages the application in a repository into per-platform
//! release archives. Validation failures before the first stage exit with
//! status 0 so wrapping scripts treat them as a clean abort; a failed stage
//! exits with status 1.

use camino::Utf8PathBuf;
use clap::Parser;
use stagehand::cli::Cli;
use stagehand::confirm::StdinConfirm;
use stagehand::error::{EnvironmentError, Result};
use stagehand::executor::SystemCommandExecutor;
use stagehand::flow::{FlowContext, RunOutcome, run};
use stagehand::output::write_stderr_line;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = execute(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn execute(cli: &Cli, stderr: &mut dyn Write) -> Result<RunOutcome> {
    let cwd = current_dir()?;
    let mut confirm = StdinConfirm;
    let context = FlowContext {
        cwd: &cwd,
        executor: &SystemCommandExecutor,
        confirm: &mut confirm,
    };
    run(cli, context, stderr)
}

fn current_dir() -> std::result::Result<Utf8PathBuf, EnvironmentError> {
    let cwd = std::env::current_dir().map_err(|source| EnvironmentError::CurrentDir { source })?;
    Utf8PathBuf::try_from(cwd).map_err(|e| EnvironmentError::NonUtf8Path {
        path: e.into_path_buf().display().to_string(),
    })
}

fn exit_code_for_run_result(result: Result<RunOutcome>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) if err.is_pre_flight() => {
            write_stderr_line(stderr, err);
            0
        }
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
