//! Publishing a packaged artifact
//!
//! Three remote writes, strictly in order, stopping at the first failure:
//!
//! 1. upload the package to content storage
//! 2. create the immutable release record (registry must answer 201)
//! 3. point the platform's current version at the new release (200)
//!
//! A failure after step 1 leaves an unreferenced blob. A failure at step 3
//! leaves a valid release record that is not yet current; rerunning only
//! the pointer step (`distkit repoint`) completes the publish.

use tracing::info;

use distkit_protocol::ReleaseKey;

use crate::package::{PackagedArtifact, PackagingError};
use crate::registry::{RegistryClient, RegistryError, StorageClient};
use crate::state::{PlatformRun, PlatformRunState, RunStateError};

/// Which publish step failed
#[derive(Debug, thiserror::Error)]
pub enum PublishStepError {
    #[error("upload failed: {0}")]
    Upload(#[source] RegistryError),

    #[error("registration failed: {0}")]
    Register(#[source] RegistryError),

    #[error("current-version update failed: {0}")]
    Pointer(#[source] RegistryError),

    #[error(transparent)]
    Record(#[from] PackagingError),

    #[error(transparent)]
    State(#[from] RunStateError),
}

/// Performs the upload, register and pointer writes for one release
pub struct Publisher<'r, 'a> {
    registry: &'r RegistryClient<'a>,
    storage: &'r StorageClient<'a>,
}

impl<'r, 'a> Publisher<'r, 'a> {
    pub fn new(registry: &'r RegistryClient<'a>, storage: &'r StorageClient<'a>) -> Self {
        Self { registry, storage }
    }

    /// Publish `artifact` as `key`, advancing `run` after each step.
    pub fn publish(
        &self,
        key: &ReleaseKey,
        artifact: &PackagedArtifact,
        run: &mut PlatformRun,
    ) -> Result<(), PublishStepError> {
        let record = artifact.record()?;

        self.storage
            .upload(&artifact.storage_key, &artifact.compressed)
            .map_err(PublishStepError::Upload)?;
        run.transition(PlatformRunState::Uploaded)?;

        self.registry
            .register_release(key, &record)
            .map_err(PublishStepError::Register)?;
        run.transition(PlatformRunState::Registered)?;
        info!(key = %key.record_key(), sha256 = %record.sha256_hex(), "release registered");

        set_pointer(self.registry, key)?;
        run.transition(PlatformRunState::Published)?;
        Ok(())
    }
}

/// Make `key`'s version the current one for its platform.
pub fn set_pointer(registry: &RegistryClient<'_>, key: &ReleaseKey) -> Result<(), PublishStepError> {
    registry
        .set_current(key.name(), key.platform(), key.version())
        .map_err(PublishStepError::Pointer)?;
    info!(key = %key.pointer_key(), version = %key.version(), "current version updated");
    Ok(())
}
