//! Build target platforms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Platforms offered when no allow-list is configured.
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "darwin-386",
    "darwin-amd64",
    "darwin-arm64",
    "freebsd-386",
    "freebsd-amd64",
    "freebsd-arm",
    "linux-386",
    "linux-amd64",
    "linux-arm",
    "linux-arm64",
    "windows-386",
    "windows-amd64",
];

/// An (operating system, architecture) pair, written `{os}-{arch}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    /// Create a platform from its two halves.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Result<Self, ProtocolError> {
        let os = os.into();
        let arch = arch.into();
        let valid = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        };
        if !valid(&os) || !valid(&arch) {
            return Err(ProtocolError::InvalidPlatform(format!("{}-{}", os, arch)));
        }
        Ok(Self { os, arch })
    }

    /// The platform this binary was compiled for, in Go-style vocabulary.
    pub fn host() -> Result<Self, ProtocolError> {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Platforms in [`DEFAULT_PLATFORMS`].
    pub fn defaults() -> Vec<Platform> {
        DEFAULT_PLATFORMS
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the first dash, as the os half never contains one.
        let (os, arch) = s
            .split_once('-')
            .ok_or_else(|| ProtocolError::InvalidPlatform(s.to_string()))?;
        Self::new(os, arch).map_err(|_| ProtocolError::InvalidPlatform(s.to_string()))
    }
}

impl TryFrom<String> for Platform {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.to_string()
    }
}
