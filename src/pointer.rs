//! Current-version pointer maintenance
//!
//! `repoint` reruns only the last publish step for a release that is
//! already registered, which is how a publish that failed at the pointer
//! update is completed. `status` reads the pointers.

use tracing::{error, info};

use distkit_protocol::{Platform, ReleaseKey};

use crate::config::DistConfig;
use crate::credentials::{CredentialError, CredentialResolver};
use crate::publish::{set_pointer, PublishStepError};
use crate::registry::{RegistryClient, RegistryError, ReleaseLookup};
use crate::transport::Transport;
use crate::version::{ResolvedVersion, VersionError};

#[derive(Debug, thiserror::Error)]
pub enum PointerError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Key(#[from] distkit_protocol::ProtocolError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{key} is not registered; build and publish it first")]
    NotRegistered { key: String },

    #[error("could not check whether the release exists: {0}")]
    LookupFailed(#[source] RegistryError),

    #[error(transparent)]
    Pointer(#[from] PublishStepError),

    #[error("could not read current version: {0}")]
    Read(#[source] RegistryError),
}

/// Result of repointing one platform
#[derive(Debug)]
pub struct RepointOutcome {
    pub platform: Platform,
    pub result: Result<(), PointerError>,
}

/// Pointer operations against the configured registry
pub struct PointerOps<'a> {
    config: &'a DistConfig,
    transport: &'a dyn Transport,
    credentials: CredentialResolver,
}

impl<'a> PointerOps<'a> {
    pub fn new(config: &'a DistConfig, transport: &'a dyn Transport) -> Self {
        Self {
            config,
            transport,
            credentials: CredentialResolver::new(config.netrc_path.clone()),
        }
    }

    fn registry(&self) -> Result<RegistryClient<'a>, CredentialError> {
        RegistryClient::connect(self.transport, &self.config.registry_url, &self.credentials)
    }

    /// Point each platform at `version`, refusing platforms whose release
    /// record does not exist.
    pub fn repoint(&self, version: &str, platforms: &[Platform]) -> Vec<RepointOutcome> {
        platforms
            .iter()
            .map(|platform| {
                let result = self.repoint_one(version, platform);
                match &result {
                    Ok(()) => info!(platform = %platform, version, "repointed"),
                    Err(e) => error!(platform = %platform, version, error = %e, "repoint failed"),
                }
                RepointOutcome {
                    platform: platform.clone(),
                    result,
                }
            })
            .collect()
    }

    fn repoint_one(&self, version: &str, platform: &Platform) -> Result<(), PointerError> {
        let version = ResolvedVersion::parse(version)?;
        let key = ReleaseKey::new(
            &self.config.artifact_name,
            version.as_str(),
            platform.clone(),
        )?;
        let registry = self.registry()?;

        match registry.lookup_release(&key) {
            Ok(ReleaseLookup::Found(_)) => {}
            Ok(ReleaseLookup::NotFound) => {
                return Err(PointerError::NotRegistered {
                    key: key.record_key(),
                })
            }
            Err(e) => return Err(PointerError::LookupFailed(e)),
        }

        set_pointer(&registry, &key)?;
        Ok(())
    }

    /// Current version for each platform (None when no pointer exists)
    pub fn status(
        &self,
        platforms: &[Platform],
    ) -> Vec<(Platform, Result<Option<String>, PointerError>)> {
        platforms
            .iter()
            .map(|platform| {
                let result = self.registry().map_err(PointerError::from).and_then(|registry| {
                    registry
                        .current_version(&self.config.artifact_name, platform)
                        .map(|p| p.map(|p| p.version))
                        .map_err(PointerError::Read)
                });
                (platform.clone(), result)
            })
            .collect()
    }
}
