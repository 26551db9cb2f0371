//! Per-platform application packaging.

use crate::config::VersionStrings;
use crate::error::ToolError;
use crate::executor::{CommandExecutor, CommandSpec, run_checked};
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

/// CPU architecture every artifact is built for.
pub const ARCH: &str = "x64";

/// Metadata stamped into every packaged artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Application name; also names the output directory.
    pub app_name: String,
    /// Application version being released.
    pub version: String,
    /// Directory holding `icon.ico` and `icon.icns`.
    pub icon_dir: Utf8PathBuf,
    /// Copyright string.
    pub copyright: String,
    /// Windows version-string resource fields.
    pub version_strings: VersionStrings,
}

impl ArtifactMetadata {
    /// Icon file used for `platform`.
    #[must_use]
    pub fn icon_for(&self, platform: Platform) -> Utf8PathBuf {
        self.icon_dir
            .join(format!("icon.{}", platform.icon_extension()))
    }

    /// Non-empty version-string fields as `(key, value)` pairs.
    fn version_string_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let v = &self.version_strings;
        [
            ("CompanyName", v.company_name.as_str()),
            ("FileDescription", v.file_description.as_str()),
            ("OriginalFilename", v.original_filename.as_str()),
            ("ProductName", v.product_name.as_str()),
            ("InternalName", v.internal_name.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// Everything needed to package one platform.
#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    /// Target platform.
    pub platform: Platform,
    /// Staged application tree.
    pub source_dir: &'a Utf8Path,
    /// Directory receiving packaged output.
    pub releases_dir: &'a Utf8Path,
    /// Artifact metadata.
    pub metadata: &'a ArtifactMetadata,
}

impl PackageRequest<'_> {
    /// Directory the packager writes for this request.
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use stagehand::config::VersionStrings;
    /// use stagehand::packager::{ArtifactMetadata, PackageRequest};
    /// use stagehand::platform::Platform;
    ///
    /// let metadata = ArtifactMetadata {
    ///     app_name: "Demo".to_owned(),
    ///     version: "1.0.1".to_owned(),
    ///     icon_dir: "/repo/icons".into(),
    ///     copyright: String::new(),
    ///     version_strings: VersionStrings::default(),
    /// };
    /// let request = PackageRequest {
    ///     platform: Platform::Linux,
    ///     source_dir: Utf8Path::new("/repo/app"),
    ///     releases_dir: Utf8Path::new("/repo/releases"),
    ///     metadata: &metadata,
    /// };
    /// assert_eq!(request.output_dir(), Utf8Path::new("/repo/releases/Demo-linux-x64"));
    /// ```
    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.releases_dir.join(format!(
            "{}-{}-{ARCH}",
            self.metadata.app_name, self.platform
        ))
    }
}

/// Packages a staged application for one platform.
pub trait Packager: Send + Sync {
    /// Package `request` and return the output directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the packager fails or produces no output.
    fn package(&self, request: &PackageRequest<'_>) -> Result<Utf8PathBuf, ToolError>;
}

/// Packager driving the `electron-packager` command line.
pub struct CommandPackager<'a> {
    executor: &'a dyn CommandExecutor,
    program: String,
}

impl<'a> CommandPackager<'a> {
    /// Create a packager that runs `program`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }

    fn command_for(&self, request: &PackageRequest<'_>) -> CommandSpec {
        let metadata = request.metadata;
        let mut spec = CommandSpec::new(&self.program)
            .arg(request.source_dir.as_str())
            .arg(&metadata.app_name)
            .arg(format!("--platform={}", request.platform))
            .arg(format!("--arch={ARCH}"))
            .arg(format!("--out={}", request.releases_dir))
            .args(["--overwrite", "--prune"])
            .arg(format!("--icon={}", metadata.icon_for(request.platform)))
            .arg(format!("--app-version={}", metadata.version));

        if !metadata.copyright.is_empty() {
            spec = spec.arg(format!("--app-copyright={}", metadata.copyright));
        }
        for (key, value) in metadata.version_string_pairs() {
            spec = spec.arg(format!("--win32metadata.{key}={value}"));
        }
        spec
    }
}

impl Packager for CommandPackager<'_> {
    fn package(&self, request: &PackageRequest<'_>) -> Result<Utf8PathBuf, ToolError> {
        let spec = self.command_for(request);
        run_checked(self.executor, &spec)?;

        let output = request.output_dir();
        if !output.is_dir() {
            return Err(ToolError::MissingOutput {
                program: self.program.clone(),
                path: output,
            });
        }
        debug!("packaged {} to {output}", request.platform);
        Ok(output)
    }
}
