//! Release version resolution
//!
//! The version comes from `git describe` in the checkout. The tag must start
//! with the release marker `v`; the rest is the version, restricted to
//! `[A-Za-z0-9.-]` so it can be embedded in storage keys and registry paths.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use distkit_protocol::{is_allowed_char, RELEASE_TAG_MARKER};

use crate::runner::{CommandRunner, CommandSpec};

/// Version resolution failures
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("failed to start git: {0}")]
    Spawn(#[source] io::Error),

    #[error("no release tag reachable from HEAD: {0}")]
    NoTag(String),

    #[error("bad tag name '{tag}': must start with '{marker}'")]
    MissingMarker { tag: String, marker: char },

    #[error("bad tag name '{tag}': empty version")]
    EmptyVersion { tag: String },

    #[error("bad tag name '{tag}': character {ch:?} not allowed in a version")]
    DisallowedChar { tag: String, ch: char },
}

/// A validated version string (the tag without its marker)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedVersion(String);

impl ResolvedVersion {
    /// Validate a tag such as `v1.2.3` and strip the marker.
    pub fn from_tag(tag: &str) -> Result<Self, VersionError> {
        let tag = tag.trim();
        let Some(version) = tag.strip_prefix(RELEASE_TAG_MARKER) else {
            return Err(VersionError::MissingMarker {
                tag: tag.to_string(),
                marker: RELEASE_TAG_MARKER,
            });
        };
        Self::parse(version).map_err(|e| match e {
            VersionError::EmptyVersion { .. } => VersionError::EmptyVersion { tag: tag.to_string() },
            VersionError::DisallowedChar { ch, .. } => VersionError::DisallowedChar {
                tag: tag.to_string(),
                ch,
            },
            other => other,
        })
    }

    /// Validate a bare version such as `1.2.3`.
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        if version.is_empty() {
            return Err(VersionError::EmptyVersion {
                tag: version.to_string(),
            });
        }
        if let Some(ch) = version.chars().find(|c| !is_allowed_char(*c)) {
            return Err(VersionError::DisallowedChar {
                tag: version.to_string(),
                ch,
            });
        }
        Ok(Self(version.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads the most recent descriptive tag of a checkout
pub struct VersionResolver<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> VersionResolver<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub fn resolve(&self, workdir: &Path) -> Result<ResolvedVersion, VersionError> {
        let spec = CommandSpec::new("git").arg("describe").current_dir(workdir);
        let output = self.runner.run(&spec).map_err(VersionError::Spawn)?;
        if !output.success() {
            return Err(VersionError::NoTag(output.diagnostics()));
        }

        let tag = output.stdout_str();
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(VersionError::NoTag("git describe printed nothing".to_string()));
        }

        let version = ResolvedVersion::from_tag(tag)?;
        info!(tag, version = %version, "resolved version");
        Ok(version)
    }
}
