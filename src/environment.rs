//! Pre-flight loading and validation of the repository being built.
//!
//! Nothing here writes to the filesystem, so every [`EnvironmentError`] is
//! safe to retry after fixing the repository.

use crate::config::PipelineConfig;
use crate::error::EnvironmentError;
use crate::manifest::Manifest;
use crate::platform::{Platform, parse_platforms};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;

/// Which configured list a path warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathList {
    /// The `ignoreList` entries.
    Ignore,
    /// The `minifyList` entries.
    Minify,
}

impl fmt::Display for PathList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => f.write_str("ignore list"),
            Self::Minify => f.write_str("minify list"),
        }
    }
}

/// A configured path that does not exist in the source tree.
///
/// These are reported to the operator but do not stop the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathWarning {
    /// List the entry came from.
    pub list: PathList,
    /// Resolved path that was not found.
    pub path: Utf8PathBuf,
}

impl fmt::Display for PathWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path in {}: {}", self.list, self.path)
    }
}

/// A validated repository, ready to be turned into a pipeline run.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Repository root holding the manifest and configuration.
    pub repository: Utf8PathBuf,
    /// Directory whose contents are staged.
    pub source_root: Utf8PathBuf,
    /// Loaded manifest.
    pub manifest: Manifest,
    /// Loaded configuration.
    pub config: PipelineConfig,
    /// Application name used for packaged artifacts.
    pub app_name: String,
    /// Validated platform targets.
    pub platforms: Vec<Platform>,
    /// Configured paths that do not exist.
    pub warnings: Vec<PathWarning>,
}

impl Environment {
    /// Load and validate the repository at `repository`.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvironmentError`] when the repository, manifest,
    /// configuration or platform list is missing or invalid.
    pub fn read(repository: &Utf8Path) -> Result<Self, EnvironmentError> {
        let repository = normalise_repository_arg(repository);
        if !repository.is_dir() {
            return Err(EnvironmentError::NotADirectory { path: repository });
        }

        let manifest = Manifest::load(&repository)?;
        let config = PipelineConfig::load(&repository)?;

        let app_name = manifest
            .app_name()
            .ok_or(EnvironmentError::MissingAppName)?
            .to_owned();
        let platforms = parse_platforms(&config.platforms)?;

        let source_root = config.source_root(&repository);
        if !source_root.is_dir() {
            return Err(EnvironmentError::SourceDirMissing { path: source_root });
        }

        let warnings = find_missing_paths(&source_root, &config);
        debug!(
            "loaded {app_name} {} from {repository} ({} platform(s), {} warning(s))",
            manifest.version(),
            platforms.len(),
            warnings.len()
        );

        Ok(Self {
            repository,
            source_root,
            manifest,
            config,
            app_name,
            platforms,
            warnings,
        })
    }
}

/// Strip quotes that shells on some platforms leave around a path argument.
fn normalise_repository_arg(raw: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(raw.as_str().trim_matches('"'))
}

/// Report configured minify and ignore entries that do not exist under
/// `source_root`.
#[must_use]
pub fn find_missing_paths(source_root: &Utf8Path, config: &PipelineConfig) -> Vec<PathWarning> {
    let lists = [
        (PathList::Minify, &config.minify_list),
        (PathList::Ignore, &config.ignore_list),
    ];

    lists
        .into_iter()
        .flat_map(|(list, entries)| {
            entries
                .iter()
                .map(move |entry| (list, source_root.join(entry)))
        })
        .filter(|(_, path)| !path.exists())
        .map(|(list, path)| PathWarning { list, path })
        .collect()
}
