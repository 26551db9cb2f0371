//! Application manifest (`package.json`) handling and version bumping.
//!
//! The manifest is kept as a JSON object so that keys the pipeline does not
//! understand survive the round trip. `serde_json` maps are ordered by key,
//! which gives the persisted file a stable key order.

use crate::error::{EnvironmentError, StageFailure};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::str::FromStr;

/// File name of the manifest inside the repository root.
pub const MANIFEST_FILE: &str = "package.json";

/// A `MAJOR.MINOR.PATCH` version made of exactly three integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl Version {
    /// Return the version with the patch component incremented.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure::InvalidVersion`] when the patch component is
    /// already `u64::MAX`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stagehand::manifest::Version;
    ///
    /// let version: Version = "1.2.3".parse().expect("valid version");
    /// assert_eq!(version.bumped().expect("bumpable").to_string(), "1.2.4");
    /// ```
    pub fn bumped(self) -> Result<Self, StageFailure> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| StageFailure::InvalidVersion {
                version: self.to_string(),
            })?;
        Ok(Self { patch, ..self })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = StageFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StageFailure::InvalidVersion {
            version: s.to_owned(),
        };
        let parse_component = |part: &str| -> Result<u64, StageFailure> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let mut parts = s.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            major: parse_component(major)?,
            minor: parse_component(minor)?,
            patch: parse_component(patch)?,
        })
    }
}

/// The application manifest, loaded from and persisted to `package.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: Utf8PathBuf,
    fields: Map<String, Value>,
}

impl Manifest {
    /// Load the manifest from `<repository>/package.json`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::ManifestNotFound`] when the file is absent
    /// and [`EnvironmentError::InvalidManifest`] when it is not a JSON object
    /// with a string `version`.
    pub fn load(repository: &Utf8Path) -> Result<Self, EnvironmentError> {
        let path = repository.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(EnvironmentError::ManifestNotFound {
                repository: repository.to_owned(),
            });
        }

        let contents =
            fs::read_to_string(&path).map_err(|e| EnvironmentError::InvalidManifest {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Self::from_json(path, &contents)
    }

    /// Parse manifest contents that were read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidManifest`] when `contents` is not a
    /// JSON object with a string `version`.
    pub fn from_json(path: Utf8PathBuf, contents: &str) -> Result<Self, EnvironmentError> {
        let invalid = |reason: String| EnvironmentError::InvalidManifest {
            path: path.clone(),
            reason,
        };

        let value: Value = serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(invalid("expected a JSON object".to_owned()));
        };
        if !fields.get("version").is_some_and(Value::is_string) {
            return Err(invalid("missing string field \"version\"".to_owned()));
        }

        Ok(Self { path, fields })
    }

    /// Location the manifest is persisted to.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The `name` field, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.string_field("name")
    }

    /// The `productName` field, if present.
    #[must_use]
    pub fn product_name(&self) -> Option<&str> {
        self.string_field("productName")
    }

    /// The application name: `productName`, falling back to `name`.
    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        self.product_name()
            .filter(|name| !name.is_empty())
            .or_else(|| self.name().filter(|name| !name.is_empty()))
    }

    /// The raw `version` string.
    #[must_use]
    pub fn version(&self) -> &str {
        self.string_field("version").unwrap_or_default()
    }

    /// Parse the version and replace it with the bumped version in memory.
    ///
    /// Returns the previous and new versions. Nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure::InvalidVersion`] when the version is not three
    /// dot-separated integers or its patch component cannot be incremented;
    /// the manifest is left unchanged.
    pub fn bump_version(&mut self) -> Result<(Version, Version), StageFailure> {
        let current: Version = self.version().parse()?;
        let next = current.bumped()?;
        self.fields
            .insert("version".to_owned(), Value::String(next.to_string()));
        Ok((current, next))
    }

    /// Serialise the manifest with sorted keys, tab indentation and a
    /// trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure::Serialization`] if serialisation fails.
    pub fn to_pretty_json(&self) -> Result<String, StageFailure> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.fields.serialize(&mut serializer)?;
        buffer.push(b'\n');
        // serde_json only ever emits UTF-8.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the manifest back to [`Self::path`].
    ///
    /// # Errors
    ///
    /// Returns a [`StageFailure`] if serialisation or the write fails.
    pub fn save(&self) -> Result<(), StageFailure> {
        let data = self.to_pretty_json()?;
        fs::write(&self.path, data).map_err(|e| StageFailure::io(&self.path, e))
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}
