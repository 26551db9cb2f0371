//! The end-to-end build flow behind the `stagehand` binary.
//!
//! Reading the repository, showing the plan, asking for confirmation and
//! printing the summary live here so `main.rs` only parses arguments and maps
//! the result to an exit code.

use crate::archive::ZipArchiver;
use crate::cli::Cli;
use crate::confirm::{Confirm, START_PROMPT};
use crate::dependencies::NpmInstaller;
use crate::environment::Environment;
use crate::error::{PipelineError, Result};
use crate::executor::CommandExecutor;
use crate::minify::CommandMinifier;
use crate::output::{DryRunInfo, banner, config_dump, summary_text, write_stderr_line};
use crate::packager::CommandPackager;
use crate::pipeline::{Collaborators, Pipeline, PipelineRun, RunSummary};
use camino::Utf8Path;
use log::debug;
use std::io::Write;

/// How a run ended without error.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stage completed.
    Built(Box<RunSummary>),
    /// `--dry-run` printed the plan.
    DryRun,
    /// The operator declined to start the build.
    Declined,
}

/// Host services the flow needs.
pub struct FlowContext<'a> {
    /// Directory relative paths are resolved against.
    pub cwd: &'a Utf8Path,
    /// Runs external tools.
    pub executor: &'a dyn CommandExecutor,
    /// Asks for confirmation.
    pub confirm: &'a mut dyn Confirm,
}

/// Read the repository named by `cli` and build it.
///
/// # Errors
///
/// Returns [`PipelineError::Environment`] when the repository is invalid,
/// [`PipelineError::Stage`] when a stage fails and
/// [`PipelineError::WriteFailed`] when the confirmation prompt fails.
pub fn run(cli: &Cli, context: FlowContext<'_>, stderr: &mut dyn Write) -> Result<RunOutcome> {
    let FlowContext {
        cwd,
        executor,
        confirm,
    } = context;

    if !cli.quiet {
        write_stderr_line(stderr, banner());
        write_stderr_line(stderr, "");
    }

    let env = Environment::read(&cli.repository_path(cwd))?;
    for warning in &env.warnings {
        write_stderr_line(stderr, format!("Warning: {warning}"));
    }

    let verify = env.config.verify_config && !cli.yes;
    let tools = env.config.tools.clone();
    let options = cli.pipeline_options();
    let mut run = PipelineRun::new(env, cli.work_dirs(cwd));
    debug!("resolved working directories: {:?}", run.dirs);

    if cli.dry_run {
        let info = DryRunInfo {
            run: &run,
            workers: options.workers_for(run.platforms.len()),
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(RunOutcome::DryRun);
    }

    if !cli.quiet {
        write_stderr_line(stderr, config_dump(&run));
        write_stderr_line(stderr, "");
    }

    if verify {
        let accepted = confirm
            .confirm(START_PROMPT, stderr)
            .map_err(|source| PipelineError::WriteFailed { source })?;
        if !accepted {
            write_stderr_line(stderr, "Build cancelled.");
            return Ok(RunOutcome::Declined);
        }
    }

    let minifier = CommandMinifier::new(executor, tools.clone());
    let installer = NpmInstaller::new(executor, tools.npm);
    let packager = CommandPackager::new(executor, tools.packager);
    let collaborators = Collaborators {
        minifier: &minifier,
        installer: &installer,
        packager: &packager,
        archiver: &ZipArchiver,
    };

    let summary = Pipeline::new(collaborators, options).execute(&mut run, stderr)?;

    if !cli.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, summary_text(&summary));
        if cli.verbosity > 0 {
            write_minified_files(&summary, stderr);
        }
        write_stderr_line(stderr, "");
        write_stderr_line(
            stderr,
            format!("Released {} {}.", run.metadata.app_name, summary.version),
        );
    }

    Ok(RunOutcome::Built(Box::new(summary)))
}

fn write_minified_files(summary: &RunSummary, stderr: &mut dyn Write) {
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, "Minified files:");
    for path in &summary.minify.minified {
        write_stderr_line(stderr, format!("  - {path}"));
    }
    for path in &summary.minify.unsupported {
        write_stderr_line(stderr, format!("  - {path} (unsupported, left as is)"));
    }
}
