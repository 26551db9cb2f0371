//! Minification of staged sources.
//!
//! Files are dispatched to a minifier by extension. An unsupported extension
//! is a soft failure: it is reported and the stage carries on. A minifier
//! that cannot be launched or exits unsuccessfully is a hard failure and
//! aborts the run.

use crate::config::ToolPaths;
use crate::error::{StageFailure, ToolError};
use crate::executor::{CommandExecutor, CommandSpec, run_checked};
use crate::staging::collect_files;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};

/// Result of minifying one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyOutcome {
    /// The file was minified in place.
    Minified,
    /// No minifier handles this file's extension; the file is unchanged.
    Unsupported,
}

/// Minifies a single file in place.
#[cfg_attr(test, mockall::automock)]
pub trait Minifier {
    /// Minify `path` in place.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the underlying minifier fails.
    fn minify(&self, path: &Utf8Path) -> Result<MinifyOutcome, ToolError>;
}

/// Minifier that shells out to Babel for `.js` and `minify` for `.css`.
pub struct CommandMinifier<'a> {
    executor: &'a dyn CommandExecutor,
    tools: ToolPaths,
}

impl<'a> CommandMinifier<'a> {
    /// Create a minifier that runs the configured tools through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, tools: ToolPaths) -> Self {
        Self { executor, tools }
    }

    fn command_for(&self, path: &Utf8Path) -> Option<CommandSpec> {
        match path.extension() {
            Some("js") => Some(
                CommandSpec::new(&self.tools.babel)
                    .arg(path.as_str())
                    .args(["--out-file", path.as_str(), "--presets", "babili"]),
            ),
            Some("css") => Some(
                CommandSpec::new(&self.tools.css_minify)
                    .arg(path.as_str())
                    .args(["--output", path.as_str()]),
            ),
            _ => None,
        }
    }
}

impl Minifier for CommandMinifier<'_> {
    fn minify(&self, path: &Utf8Path) -> Result<MinifyOutcome, ToolError> {
        let Some(spec) = self.command_for(path) else {
            return Ok(MinifyOutcome::Unsupported);
        };
        run_checked(self.executor, &spec)?;
        Ok(MinifyOutcome::Minified)
    }
}

/// What the minify stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinifyReport {
    /// Files minified in place.
    pub minified: Vec<Utf8PathBuf>,
    /// Files skipped because their extension is unsupported.
    pub unsupported: Vec<Utf8PathBuf>,
}

/// Minify every configured target under `staging_root`.
///
/// A target ending in a separator, or naming a directory, is walked
/// recursively.
///
/// # Errors
///
/// Returns [`StageFailure::MissingMinifyTarget`] when a target does not exist
/// and [`StageFailure::Tool`] on the first minifier failure.
pub fn minify_targets<S: AsRef<str>>(
    minifier: &dyn Minifier,
    staging_root: &Utf8Path,
    targets: &[S],
) -> Result<MinifyReport, StageFailure> {
    let mut report = MinifyReport::default();

    for target in targets {
        let target = target.as_ref();
        let path = staging_root.join(target);
        let wants_dir = target.ends_with('/') || target.ends_with('\\');

        if wants_dir || path.is_dir() {
            if !path.is_dir() {
                return Err(StageFailure::MissingMinifyTarget { path });
            }
            for file in collect_files(&path)? {
                minify_one(minifier, file, &mut report)?;
            }
        } else if path.is_file() {
            minify_one(minifier, path, &mut report)?;
        } else {
            return Err(StageFailure::MissingMinifyTarget { path });
        }
    }

    Ok(report)
}

fn minify_one(
    minifier: &dyn Minifier,
    path: Utf8PathBuf,
    report: &mut MinifyReport,
) -> Result<(), StageFailure> {
    match minifier.minify(&path)? {
        MinifyOutcome::Minified => {
            debug!("minified {path}");
            report.minified.push(path);
        }
        MinifyOutcome::Unsupported => {
            warn!("{path} cannot be minified");
            report.unsupported.push(path);
        }
    }
    Ok(())
}
