//! Dependency installation and the dependency cache.
//!
//! The staging tree gets its dependencies from the installer. A cached
//! snapshot of a previous install, when present, is merged in first so the
//! installer only has to fetch what changed.

use crate::error::{StageFailure, ToolError};
use crate::executor::{CommandExecutor, CommandSpec, run_checked};
use crate::staging::{merge_tree, remove_tree};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

/// Directory the installer populates inside the staging root.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Installs an application's dependencies into a staging root.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyInstaller {
    /// Install dependencies for the application staged at `staging_root`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when the installer cannot be launched or
    /// exits unsuccessfully.
    fn install(&self, staging_root: &Utf8Path) -> Result<(), ToolError>;
}

/// Runs `npm install` in the staging root.
pub struct NpmInstaller<'a> {
    executor: &'a dyn CommandExecutor,
    program: String,
}

impl<'a> NpmInstaller<'a> {
    /// Create an installer that runs `program install`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }
}

impl DependencyInstaller for NpmInstaller<'_> {
    fn install(&self, staging_root: &Utf8Path) -> Result<(), ToolError> {
        let spec = CommandSpec::new(&self.program)
            .arg("install")
            .current_dir(staging_root);
        run_checked(self.executor, &spec)?;
        Ok(())
    }
}

/// A snapshot of a previous dependency install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCache {
    dir: Utf8PathBuf,
}

impl DependencyCache {
    /// Cache stored at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns true if a snapshot has been taken.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Merge the snapshot into `<staging_root>/node_modules`, keeping any file
    /// already present.
    ///
    /// Returns the number of files copied.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure::Io`] if the copy fails.
    pub fn restore_into(&self, staging_root: &Utf8Path) -> Result<usize, StageFailure> {
        let target = staging_root.join(DEPENDENCY_DIR);
        let copied = merge_tree(&self.dir, &target)?;
        debug!("restored {copied} cached file(s) into {target}");
        Ok(copied)
    }

    /// Replace the snapshot with a copy of `<staging_root>/node_modules`.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure::Io`] if the old snapshot cannot be removed or
    /// the copy fails.
    pub fn snapshot_from(&self, staging_root: &Utf8Path) -> Result<usize, StageFailure> {
        let source = staging_root.join(DEPENDENCY_DIR);
        if !source.is_dir() {
            debug!("nothing to cache: {source} does not exist");
            return Ok(0);
        }
        remove_tree(&self.dir)?;
        let copied = merge_tree(&source, &self.dir)?;
        debug!("cached {copied} file(s) from {source}");
        Ok(copied)
    }
}
