//! Pipeline configuration loaded from `stagehand.json`.
//!
//! Every key is optional. Missing keys take the defaults documented on each
//! field, so an empty object is a valid configuration apart from the platform
//! list, which [`crate::environment`] requires to be non-empty.

use crate::error::EnvironmentError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;

/// File name of the pipeline configuration inside the repository root.
pub const CONFIG_FILE: &str = "stagehand.json";

/// Pipeline configuration for one repository.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Ignore entries, each parsed into a [`crate::matcher::Rule`].
    pub ignore_list: Vec<String>,
    /// Files or directories to minify, relative to the staging root.
    #[serde(alias = "uglifyList")]
    pub minify_list: Vec<String>,
    /// Platform identifiers to package for.
    pub platforms: Vec<String>,
    /// Ask for confirmation before building. Defaults to `true`.
    pub verify_config: bool,
    /// Zip packaged output. Defaults to `true`.
    pub archive_output: bool,
    /// Alternate source directory relative to the repository root.
    pub src_dir: Option<String>,
    /// Windows version-string metadata passed to the packager.
    pub version_string: VersionStrings,
    /// External tool overrides.
    pub tools: ToolPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ignore_list: Vec::new(),
            minify_list: Vec::new(),
            platforms: Vec::new(),
            verify_config: true,
            archive_output: true,
            src_dir: None,
            version_string: VersionStrings::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl PipelineConfig {
    /// Load `<repository>/stagehand.json`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidConfig`] when the file cannot be read
    /// or parsed.
    pub fn load(repository: &Utf8Path) -> Result<Self, EnvironmentError> {
        let path = repository.join(CONFIG_FILE);
        let contents = fs::read_to_string(&path).map_err(|e| EnvironmentError::InvalidConfig {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::from_json(&path, &contents)
    }

    /// Parse configuration contents read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidConfig`] on malformed JSON or
    /// mistyped keys.
    pub fn from_json(path: &Utf8Path, contents: &str) -> Result<Self, EnvironmentError> {
        serde_json::from_str(contents).map_err(|e| EnvironmentError::InvalidConfig {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Resolve the directory staged from: `srcDir` under `repository`, or the
    /// repository itself.
    #[must_use]
    pub fn source_root(&self, repository: &Utf8Path) -> Utf8PathBuf {
        match self.src_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => repository.join(dir),
            _ => repository.to_owned(),
        }
    }
}

/// Windows version-string resource fields.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct VersionStrings {
    /// Company name; also used as the copyright string.
    pub company_name: String,
    /// File description.
    pub file_description: String,
    /// Original file name.
    pub original_filename: String,
    /// Product name.
    pub product_name: String,
    /// Internal name.
    pub internal_name: String,
}

/// Programs used for the external pipeline steps.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolPaths {
    /// JavaScript minifier (Babel with the babili preset).
    pub babel: String,
    /// CSS minifier.
    pub css_minify: String,
    /// Dependency installer.
    pub npm: String,
    /// Platform packager.
    pub packager: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            babel: "node_modules/.bin/babel".to_owned(),
            css_minify: "node_modules/.bin/minify".to_owned(),
            npm: "npm".to_owned(),
            packager: "electron-packager".to_owned(),
        }
    }
}
