//! Stage names and the runner that turns stage outcomes into [`StageError`]s.

use crate::error::{StageError, StageFailure};
use std::fmt;

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageName {
    /// Remove the staging tree.
    Clean,
    /// Copy non-excluded source paths into the staging tree.
    StageSource,
    /// Minify configured targets in place.
    Minify,
    /// Restore cached dependencies and run the installer.
    InstallDependencies,
    /// Increment the patch component of the manifest version.
    BumpVersion,
    /// Package and archive each platform.
    Package,
    /// Persist the manifest and clean up.
    Commit,
}

impl StageName {
    /// Every stage in the order the pipeline runs them.
    pub const ORDER: [Self; 7] = [
        Self::Clean,
        Self::StageSource,
        Self::Minify,
        Self::InstallDependencies,
        Self::BumpVersion,
        Self::Package,
        Self::Commit,
    ];

    /// Human-readable stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::StageSource => "stage source",
            Self::Minify => "minify",
            Self::InstallDependencies => "install dependencies",
            Self::BumpVersion => "bump version",
            Self::Package => "package",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs a single stage action and attributes any failure to the stage.
///
/// The runner does not log and never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageRunner;

impl StageRunner {
    /// Invoke `action` as stage `stage`.
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] naming `stage` when `action` fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stagehand::error::StageFailure;
    /// use stagehand::stage::{StageName, StageRunner};
    ///
    /// let err = StageRunner
    ///     .run(StageName::BumpVersion, || {
    ///         Err::<(), _>(StageFailure::InvalidVersion { version: "1.2".to_owned() })
    ///     })
    ///     .expect_err("stage should fail");
    /// assert_eq!(err.stage, StageName::BumpVersion);
    /// ```
    pub fn run<T, E, F>(self, stage: StageName, action: F) -> Result<T, StageError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<StageFailure>,
    {
        action().map_err(|cause| StageError {
            stage,
            cause: cause.into(),
        })
    }
}
