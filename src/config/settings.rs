//! Typed, validated configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use distkit_protocol::{validate_component, Platform};

use super::defaults::BuiltinDefaults;
use super::merge::deep_merge;
use super::ConfigError;
use crate::build::Toolchain;
use crate::registry::SigningKeys;

/// Resolved configuration shared by every component of a run.
#[derive(Debug, Clone)]
pub struct DistConfig {
    /// Base URL of the release registry (records and pointers)
    pub registry_url: Url,
    /// Base URL of the content store (gzip packages)
    pub storage_url: Url,
    /// Explicit storage key pair, used to sign uploads instead of netrc
    pub storage_keys: Option<(String, String)>,
    /// Region named in storage request signatures
    pub storage_region: String,
    /// Artifact (executable) name
    pub artifact_name: String,
    /// Source repository to clone
    pub repository: String,
    /// Branch to check out
    pub branch: String,
    /// Working directory for the checkout
    pub workdir: PathBuf,
    pub toolchain: Toolchain,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// netrc file consulted for credentials; None disables the lookup
    pub netrc_path: Option<PathBuf>,
    /// Platforms accepted by `build`, and the set built by `build all`
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    registry: RawUrl,
    storage: RawStorage,
    artifact: RawArtifact,
    source: RawSource,
    build: RawBuild,
    http: RawHttp,
    credentials: RawCredentials,
    platforms: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUrl {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStorage {
    url: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawArtifact {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSource {
    repository: Option<String>,
    branch: Option<String>,
    workdir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBuild {
    toolchain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHttp {
    connect_timeout_seconds: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCredentials {
    netrc: Option<String>,
}

const MAX_TIMEOUT_SECONDS: u64 = 600;

impl DistConfig {
    /// Validate a merged configuration document.
    pub fn from_merged(value: &Value) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let registry_url = parse_base_url(
            require(raw.registry.url, "registry.url", "DISTURL or --registry-url")?,
            "registry.url",
        )?;
        let storage_url = parse_base_url(
            require(raw.storage.url, "storage.url", "S3DISTURL or --storage-url")?,
            "storage.url",
        )?;

        let storage_keys = match (raw.storage.access_key, raw.storage.secret_key) {
            (Some(access), Some(secret)) => Some((access, secret)),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Validation(
                    "storage.access_key and storage.secret_key must be set together".to_string(),
                ))
            }
        };

        let storage_region = require(raw.storage.region, "storage.region", "S3_REGION")?;

        let artifact_name = require(raw.artifact.name, "artifact.name", "BUILDNAME or --name")?;
        validate_component("artifact name", &artifact_name)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let repository = require(raw.source.repository, "source.repository", "BUILDREPO or --repo")?;
        let branch = require(raw.source.branch, "source.branch", "BUILDBRANCH or --branch")?;
        let workdir = require(raw.source.workdir, "source.workdir", "--workdir")?;

        let toolchain: Toolchain = require(raw.build.toolchain, "build.toolchain", "--toolchain")?
            .parse()
            .map_err(ConfigError::Validation)?;

        let connect_timeout = timeout(raw.http.connect_timeout_seconds, "http.connect_timeout_seconds")?;
        let request_timeout = timeout(raw.http.timeout_seconds, "http.timeout_seconds")?;

        let platforms = raw
            .platforms
            .unwrap_or_default()
            .iter()
            .map(|p| {
                p.parse::<Platform>()
                    .map_err(|e| ConfigError::Validation(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if platforms.is_empty() {
            return Err(ConfigError::Validation(
                "platforms must list at least one <os>-<arch>".to_string(),
            ));
        }

        let netrc_path = raw.credentials.netrc.map(PathBuf::from).or_else(default_netrc);

        Ok(Self {
            registry_url,
            storage_url,
            storage_keys,
            storage_region,
            artifact_name,
            repository,
            branch,
            workdir: PathBuf::from(workdir),
            toolchain,
            connect_timeout,
            timeout: request_timeout,
            netrc_path,
            platforms,
        })
    }

    /// Merge `overrides` over the built-in defaults and validate.
    ///
    /// Convenient for embedding and for fixture configuration in tests.
    pub fn from_value(overrides: Value) -> Result<Self, ConfigError> {
        let merged = deep_merge(BuiltinDefaults::default().to_value(), overrides);
        Self::from_merged(&merged)
    }

    /// Keys that sign storage uploads, when a key pair is configured
    pub fn signing_keys(&self) -> Option<SigningKeys> {
        self.storage_keys
            .as_ref()
            .map(|(access, secret)| SigningKeys::new(access, secret, &self.storage_region))
    }

    /// Returns true if `platform` is in the configured allow-list.
    pub fn allows(&self, platform: &Platform) -> bool {
        self.platforms.contains(platform)
    }
}

fn require(value: Option<String>, key: &'static str, hint: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField { key, hint }),
    }
}

fn parse_base_url(raw: String, key: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(&raw)
        .map_err(|e| ConfigError::Validation(format!("{} '{}': {}", key, raw, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} must be an http(s) URL, got scheme '{}'",
            key,
            url.scheme()
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::Validation(format!(
            "{} must not carry a query or fragment",
            key
        )));
    }
    Ok(url)
}

fn timeout(seconds: Option<u64>, key: &str) -> Result<Duration, ConfigError> {
    match seconds {
        Some(s) if s > 0 && s <= MAX_TIMEOUT_SECONDS => Ok(Duration::from_secs(s)),
        _ => Err(ConfigError::Validation(format!(
            "{} must be in (0, {}]",
            key, MAX_TIMEOUT_SECONDS
        ))),
    }
}

fn default_netrc() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".netrc"))
}
