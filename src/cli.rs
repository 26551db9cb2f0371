//! CLI argument definitions for stagehand.
//!
//! This module defines the command-line interface using clap. It is kept
//! apart from the entrypoint so the binary only deals with orchestration and
//! exit codes.

use crate::pipeline::{
    DEFAULT_CACHE_DIR, DEFAULT_RELEASES_DIR, DEFAULT_STAGING_DIR, PipelineOptions, WorkDirs,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::num::NonZeroUsize;

/// Package an application into per-platform release archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "stagehand")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package an application into per-platform release archives.\n\n",
    "stagehand copies the repository into a staging tree, leaving out ignored ",
    "paths, minifies the configured sources, installs dependencies, bumps the ",
    "patch version and packages the result for every configured platform. The ",
    "new version is written back to package.json only when every platform ",
    "packaged successfully.\n\n",
    "The repository must contain package.json and stagehand.json.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build the repository in ./my-app:\n",
    "    $ stagehand my-app\n\n",
    "  Build without the confirmation prompt, two platforms at a time:\n",
    "    $ stagehand --yes --jobs 2 my-app\n\n",
    "  Preview the plan without touching the filesystem:\n",
    "    $ stagehand --dry-run my-app",
))]
pub struct Cli {
    /// Repository containing package.json and stagehand.json.
    #[arg(value_name = "REPO")]
    pub repository: Utf8PathBuf,

    /// Staging directory, recreated on every run.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_STAGING_DIR)]
    pub staging_dir: Utf8PathBuf,

    /// Directory receiving packaged artifacts.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_RELEASES_DIR)]
    pub releases_dir: Utf8PathBuf,

    /// Dependency cache directory.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: Utf8PathBuf,

    /// Maximum platforms packaged at once [default: all of them].
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<NonZeroUsize>,

    /// Start the build without asking for confirmation.
    #[arg(short, long)]
    pub yes: bool,

    /// Show the resolved plan and exit without building.
    #[arg(long)]
    pub dry_run: bool,

    /// Show more detail in the run summary (repeatable).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors and warnings still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Working directories, with relative paths resolved against `cwd`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use clap::Parser;
    /// use stagehand::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["stagehand", "demo", "--releases-dir", "/srv/out"]);
    /// let dirs = cli.work_dirs(Utf8Path::new("/work"));
    /// assert_eq!(dirs.staging, Utf8Path::new("/work/app"));
    /// assert_eq!(dirs.releases, Utf8Path::new("/srv/out"));
    /// ```
    #[must_use]
    pub fn work_dirs(&self, cwd: &Utf8Path) -> WorkDirs {
        WorkDirs {
            staging: cwd.join(&self.staging_dir),
            releases: cwd.join(&self.releases_dir),
            cache: cwd.join(&self.cache_dir),
        }
    }

    /// Repository path resolved against `cwd`.
    #[must_use]
    pub fn repository_path(&self, cwd: &Utf8Path) -> Utf8PathBuf {
        cwd.join(self.repository.as_str().trim_matches('"'))
    }

    /// Pipeline options selected on the command line.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            jobs: self.jobs,
            quiet: self.quiet,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
