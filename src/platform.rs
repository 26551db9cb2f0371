//! Supported packaging targets.

use crate::error::EnvironmentError;
use std::fmt;
use std::str::FromStr;

/// A platform the application can be packaged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    /// Windows.
    Win32,
    /// Linux.
    Linux,
    /// macOS.
    Darwin,
}

impl Platform {
    /// Every supported platform, in canonical order.
    pub const ALL: [Self; 3] = [Self::Win32, Self::Linux, Self::Darwin];

    /// The identifier used in configuration and by the packager.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Linux => "linux",
            Self::Darwin => "darwin",
        }
    }

    /// File extension of the icon variant for this platform family.
    #[must_use]
    pub const fn icon_extension(self) -> &'static str {
        match self {
            Self::Win32 | Self::Linux => "ico",
            Self::Darwin => "icns",
        }
    }

    /// Returns true when packaged output for this platform is archived.
    ///
    /// macOS bundles are left as-is.
    #[must_use]
    pub const fn is_archived(self) -> bool {
        !matches!(self, Self::Darwin)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_str() == s)
            .ok_or_else(|| EnvironmentError::UnknownPlatform { name: s.to_owned() })
    }
}

/// Parse configured platform identifiers, rejecting unknown and empty lists.
///
/// Duplicates are collapsed, keeping the first occurrence.
///
/// # Errors
///
/// Returns [`EnvironmentError::NoPlatforms`] for an empty list and
/// [`EnvironmentError::UnknownPlatform`] for the first unrecognised entry.
pub fn parse_platforms<S: AsRef<str>>(names: &[S]) -> Result<Vec<Platform>, EnvironmentError> {
    if names.is_empty() {
        return Err(EnvironmentError::NoPlatforms);
    }

    let mut platforms = Vec::with_capacity(names.len());
    for name in names {
        let platform: Platform = name.as_ref().parse()?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    Ok(platforms)
}
