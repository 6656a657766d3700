//! Daemon REST surface.

use std::path::Path;

use super::errors::RemoteError;
use crate::domain::Container;
use crate::domain::ContainerId;
use crate::domain::EnvExport;

/// Typed calls against the daemon. Every call is issued once; callers decide what to
/// do with a failure.
pub trait RemoteApi: Send + Sync {
    /// `POST /containers[?dockerfile=true]` with `{localPath}`.
    fn create_container(
        &self,
        local_path: &Path,
        use_dockerfile: bool,
    ) -> Result<Container, RemoteError>;

    /// `PUT /containers/{id}`. Completion is reported later by a `saved` event.
    fn save_container(&self, id: &ContainerId) -> Result<(), RemoteError>;

    fn delete_container(&self, id: &ContainerId) -> Result<(), RemoteError>;

    /// `GET /env/{address}`.
    fn export_env(&self, address: &str) -> Result<EnvExport, RemoteError>;

    fn pause_sync(&self) -> Result<(), RemoteError>;

    fn resume_sync(&self) -> Result<(), RemoteError>;
}
