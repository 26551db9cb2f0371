//! Error types for the build pipeline.
//!
//! Errors fall into three groups that match when they can occur:
//!
//! - [`EnvironmentError`] is raised while reading the repository, before any
//!   stage has touched the filesystem. Retrying is always safe.
//! - [`StageError`] names the stage that failed and carries its
//!   [`StageFailure`]. The staging tree is left as the failing stage found it.
//! - [`PlatformJobError`] is the per-platform failure recorded by packaging
//!   jobs. Any of them aborts the run before the manifest is committed.

use crate::platform::Platform;
use crate::stage::StageName;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Pre-flight failures detected before the first stage runs.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The repository path does not exist or is not a directory.
    #[error("{path} is not a valid directory")]
    NotADirectory {
        /// The path supplied on the command line.
        path: Utf8PathBuf,
    },

    /// The current directory could not be determined.
    #[error("failed to determine the current directory: {source}")]
    CurrentDir {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path could not be represented as UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// The manifest file was not found in the repository.
    #[error("package.json was not found in {repository}")]
    ManifestNotFound {
        /// Repository root that was searched.
        repository: Utf8PathBuf,
    },

    /// The manifest file could not be read or parsed.
    #[error("failed to parse {path}: {reason}")]
    InvalidManifest {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The pipeline configuration file could not be read or parsed.
    #[error("failed to parse {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// Neither `productName` nor `name` is set in the manifest.
    #[error("package.json must define a non-empty name or productName")]
    MissingAppName,

    /// No platforms were configured.
    #[error("specify at least one platform to build for")]
    NoPlatforms,

    /// A configured platform is not one of the supported targets.
    #[error("{name} is not a valid platform; expected one of win32, linux, darwin")]
    UnknownPlatform {
        /// The unrecognised platform identifier.
        name: String,
    },

    /// The configured source directory does not exist.
    #[error("source directory {path} does not exist")]
    SourceDirMissing {
        /// Resolved source directory.
        path: Utf8PathBuf,
    },
}

/// Underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being operated on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external tool could not be launched or exited unsuccessfully.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A configured minify target does not exist in the staging tree.
    #[error("minify target {path} does not exist in the staging tree")]
    MissingMinifyTarget {
        /// Resolved target path.
        path: Utf8PathBuf,
    },

    /// The manifest version is not three dot-separated integers.
    #[error("invalid version format {version:?}: expected MAJOR.MINOR.PATCH")]
    InvalidVersion {
        /// The version string found in the manifest.
        version: String,
    },

    /// One or more platform jobs failed.
    #[error("{}", describe_platform_failures(.0))]
    PlatformJobs(Vec<PlatformJobError>),

    /// The manifest could not be serialised for persistence.
    #[error("manifest serialisation failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StageFailure {
    /// Build an [`StageFailure::Io`] for `path`.
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_platform_failures(failures: &[PlatformJobError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A stage of the pipeline failed; the run has been abandoned.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause}")]
pub struct StageError {
    /// The stage that failed.
    pub stage: StageName,
    /// Why it failed.
    #[source]
    pub cause: StageFailure,
}

/// Failure from invoking an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that was invoked.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// Program that was invoked.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The tool reported success but its expected output is missing.
    #[error("{program} did not produce {path}")]
    MissingOutput {
        /// Program that was invoked.
        program: String,
        /// Output path that was expected.
        path: Utf8PathBuf,
    },
}

/// Failure while compressing packaged output.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading the output tree or writing the archive failed.
    #[error("I/O error while archiving {path}: {source}")]
    Io {
        /// Path being operated on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry.
    #[error("zip error while archiving {path}: {source}")]
    Zip {
        /// Archive being written.
        path: Utf8PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },
}

/// Why a platform job did not complete.
#[derive(Debug, Error)]
pub enum JobFailure {
    /// The packager failed.
    #[error(transparent)]
    Package(ToolError),

    /// Packaging succeeded but archiving its output failed.
    #[error(transparent)]
    Archive(ArchiveError),

    /// The job was never dispatched because another platform failed first.
    #[error("skipped after an earlier platform failed")]
    Skipped,
}

/// A packaging job for one platform failed.
#[derive(Debug, Error)]
#[error("{platform}: {cause}")]
pub struct PlatformJobError {
    /// Platform whose job failed.
    pub platform: Platform,
    /// Why it failed.
    #[source]
    pub cause: JobFailure,
}

/// Top-level error returned by the pipeline entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pre-flight validation failed before any stage ran.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// A stage failed after the build started.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Failed to write operator output or read confirmation input.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Returns true for failures that happen before any filesystem mutation.
    #[must_use]
    pub fn is_pre_flight(&self) -> bool {
        matches!(self, Self::Environment(_))
    }
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
