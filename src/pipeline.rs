//! Build-and-publish pipeline
//!
//! One platform at a time:
//! fetch → resolve version → idempotency check → build → package → publish.
//!
//! Every platform gets a fresh checkout in the shared working directory, so
//! platforms never run concurrently. A platform that fails is logged with
//! its stage and the batch moves on to the next one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, info_span};

use distkit_protocol::{Platform, ReleaseKey};

use crate::build::{BuildError, Builder};
use crate::config::{ConfigError, DistConfig};
use crate::credentials::{CredentialError, CredentialResolver};
use crate::package::{self, PackagingError};
use crate::publish::{PublishStepError, Publisher};
use crate::registry::{RegistryClient, RegistryError, ReleaseLookup, StorageClient};
use crate::runner::CommandRunner;
use crate::source::{FetchError, SourceFetcher};
use crate::state::{PlatformRun, PlatformRunState, RunStateError};
use crate::summary::{BatchSummary, ExitCode, PlatformOutcome};
use crate::transport::Transport;
use crate::version::{ResolvedVersion, VersionError, VersionResolver};

/// Pipeline stage names, stable for logs and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Fetch,
    Version,
    Lookup,
    Build,
    Package,
    Upload,
    Register,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Version => "version",
            Stage::Lookup => "lookup",
            Stage::Build => "build",
            Stage::Package => "package",
            Stage::Upload => "upload",
            Stage::Register => "register",
            Stage::Publish => "publish",
        }
    }

    /// Stage whose success moves a run into `state`
    pub fn entering(state: PlatformRunState) -> Option<Stage> {
        use PlatformRunState::*;
        match state {
            Fetched => Some(Stage::Fetch),
            VersionResolved => Some(Stage::Version),
            AlreadyPublished | BuildPending => Some(Stage::Lookup),
            Built => Some(Stage::Build),
            Packaged => Some(Stage::Package),
            Uploaded => Some(Stage::Upload),
            Registered => Some(Stage::Register),
            Published => Some(Stage::Publish),
            Pending | Failed => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid version: {0}")]
    InvalidVersion(#[from] VersionError),

    /// Not a failure: the release already exists
    #[error("{key} is already published")]
    AlreadyPublished { key: String },

    #[error("could not check whether the release exists: {0}")]
    LookupFailed(#[source] RegistryError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    #[error("upload failed: {0}")]
    Upload(#[source] RegistryError),

    #[error("registration failed: {0}")]
    Registration(#[source] RegistryError),

    #[error("publishing current version failed: {0}")]
    Publish(#[source] RegistryError),

    #[error("credentials for {stage}: {source}")]
    Credential {
        stage: Stage,
        #[source]
        source: CredentialError,
    },

    #[error("state error: {0}")]
    State(#[from] RunStateError),
}

impl PipelineError {
    /// Stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::InvalidVersion(_) => Stage::Version,
            PipelineError::AlreadyPublished { .. } | PipelineError::LookupFailed(_) => {
                Stage::Lookup
            }
            PipelineError::Build(_) => Stage::Build,
            PipelineError::Packaging(_) => Stage::Package,
            PipelineError::Upload(_) => Stage::Upload,
            PipelineError::Registration(_) => Stage::Register,
            PipelineError::Publish(_) => Stage::Publish,
            PipelineError::Credential { stage, .. } => *stage,
            PipelineError::State(RunStateError::InvalidTransition { from, to }) => {
                Stage::entering(*to)
                    .or_else(|| Stage::entering(*from))
                    .unwrap_or(Stage::Fetch)
            }
        }
    }

    /// False only for the already-published early exit
    pub fn is_failure(&self) -> bool {
        !matches!(self, PipelineError::AlreadyPublished { .. })
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_failure() {
            ExitCode::PlatformFailed.as_i32()
        } else {
            ExitCode::Success.as_i32()
        }
    }
}

impl From<PublishStepError> for PipelineError {
    fn from(e: PublishStepError) -> Self {
        match e {
            PublishStepError::Upload(e) => PipelineError::Upload(e),
            PublishStepError::Register(e) => PipelineError::Registration(e),
            PublishStepError::Pointer(e) => PipelineError::Publish(e),
            PublishStepError::Record(e) => PipelineError::Packaging(e),
            PublishStepError::State(e) => PipelineError::State(e),
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything needed to build one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    repository: String,
    branch: String,
    workdir: PathBuf,
    name: String,
    platform: Platform,
}

impl BuildRequest {
    pub fn new(config: &DistConfig, platform: Platform) -> Self {
        Self {
            repository: config.repository.clone(),
            branch: config.branch.clone(),
            workdir: config.workdir.clone(),
            name: config.artifact_name.clone(),
            platform,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

/// Platforms named on the command line.
///
/// No names means the host platform; `all` means the configured
/// allow-list. Named platforms must be in the allow-list.
pub fn resolve_platforms(config: &DistConfig, names: &[String]) -> Result<Vec<Platform>, ConfigError> {
    if names.is_empty() {
        return Platform::host().map(|p| vec![p]).map_err(|e| {
            ConfigError::Validation(format!("cannot determine host platform: {}", e))
        });
    }
    if names.iter().any(|n| n == "all") {
        return Ok(config.platforms.clone());
    }

    let allowed = || {
        config
            .platforms
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let mut platforms = Vec::with_capacity(names.len());
    for name in names {
        let platform: Platform = name.parse().map_err(|_| {
            ConfigError::Validation(format!("invalid platform '{}'; allowed: {}", name, allowed()))
        })?;
        if !config.allows(&platform) {
            return Err(ConfigError::Validation(format!(
                "platform '{}' is not allowed; allowed: {}",
                name,
                allowed()
            )));
        }
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    Ok(platforms)
}

/// What a run learned before it stopped
#[derive(Debug, Default)]
struct Progress {
    version: Option<ResolvedVersion>,
    sha256: Option<String>,
}

/// Drives platform runs against one configuration
pub struct Pipeline<'a> {
    config: &'a DistConfig,
    runner: &'a dyn CommandRunner,
    transport: &'a dyn Transport,
    credentials: CredentialResolver,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a DistConfig,
        runner: &'a dyn CommandRunner,
        transport: &'a dyn Transport,
    ) -> Self {
        Self {
            config,
            runner,
            transport,
            credentials: CredentialResolver::new(config.netrc_path.clone()),
        }
    }

    /// Run every platform in order, continuing past failures.
    pub fn run_batch(&self, platforms: &[Platform]) -> BatchSummary {
        let run_id = ulid::Ulid::new().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, artifact = %self.config.artifact_name, platforms = platforms.len(), "starting batch");

        let outcomes = platforms
            .iter()
            .map(|platform| self.run_platform(platform))
            .collect();

        let summary =
            BatchSummary::from_outcomes(run_id, self.config.artifact_name.clone(), started_at, outcomes);
        info!(summary = %summary.human_summary, "batch finished");
        summary
    }

    /// Run the whole pipeline for one platform.
    pub fn run_platform(&self, platform: &Platform) -> PlatformOutcome {
        let span = info_span!("platform", artifact = %self.config.artifact_name, platform = %platform);
        let _guard = span.enter();

        let start = Instant::now();
        let request = BuildRequest::new(self.config, platform.clone());
        let mut run = PlatformRun::new(platform.clone());
        let mut progress = Progress::default();

        let result = self.execute(&request, &mut run, &mut progress);
        let duration_ms = start.elapsed().as_millis() as u64;
        let version = progress.version.as_ref().map(|v| v.as_str().to_string());

        match result {
            Ok(()) => {
                info!(version = version.as_deref().unwrap_or_default(), duration_ms, "published");
                PlatformOutcome::published(
                    &run,
                    version.unwrap_or_default(),
                    progress.sha256.unwrap_or_default(),
                    duration_ms,
                )
            }
            Err(e) => {
                if e.is_failure() {
                    run.fail();
                    error!(
                        artifact = %request.name(),
                        platform = %platform,
                        stage = %e.stage(),
                        error = %e,
                        "platform failed"
                    );
                } else {
                    info!(version = version.as_deref().unwrap_or_default(), "{}", e);
                }
                PlatformOutcome::stopped(&run, version, progress.sha256, &e, duration_ms)
            }
        }
    }

    fn execute(
        &self,
        request: &BuildRequest,
        run: &mut PlatformRun,
        progress: &mut Progress,
    ) -> PipelineResult<()> {
        SourceFetcher::new(self.runner).fetch(
            request.repository(),
            request.branch(),
            request.workdir(),
        )?;
        run.transition(PlatformRunState::Fetched)?;

        let version = VersionResolver::new(self.runner).resolve(request.workdir())?;
        progress.version = Some(version.clone());
        run.transition(PlatformRunState::VersionResolved)?;

        let key = ReleaseKey::new(request.name(), version.as_str(), request.platform().clone())
            .map_err(PackagingError::from)?;

        let registry = RegistryClient::connect(self.transport, &self.config.registry_url, &self.credentials)
            .map_err(|source| PipelineError::Credential {
                stage: Stage::Lookup,
                source,
            })?;

        match registry.lookup_release(&key) {
            Ok(ReleaseLookup::Found(_)) => {
                run.transition(PlatformRunState::AlreadyPublished)?;
                return Err(PipelineError::AlreadyPublished {
                    key: key.record_key(),
                });
            }
            Ok(ReleaseLookup::NotFound) => run.transition(PlatformRunState::BuildPending)?,
            Err(e) => return Err(PipelineError::LookupFailed(e)),
        }

        let binary = Builder::new(self.runner, self.config.toolchain).build(
            request.workdir(),
            request.name(),
            &version,
            request.platform(),
        )?;
        run.transition(PlatformRunState::Built)?;

        let artifact = package::package(&binary, &key)?;
        progress.sha256 = Some(artifact.sha256_hex());
        run.transition(PlatformRunState::Packaged)?;

        let storage = StorageClient::connect(
            self.transport,
            &self.config.storage_url,
            self.config.signing_keys(),
            &self.credentials,
        )
        .map_err(|source| PipelineError::Credential {
            stage: Stage::Upload,
            source,
        })?;

        Publisher::new(&registry, &storage).publish(&key, &artifact, run)?;
        Ok(())
    }
}
