//! Container identifier and the remote environment resource.

use std::fmt;
use std::ops::Deref;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerIdError {
    #[error("Container ID cannot be empty or whitespace-only")]
    Empty,
}

/// Server-assigned container id. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn try_new(id: impl Into<String>) -> Result<Self, ContainerIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ContainerIdError::Empty);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for ContainerId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ContainerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ContainerId::try_new(raw).map_err(serde::de::Error::custom)
    }
}

/// Empty ids coming off the wire are the same as no id at all.
fn optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ContainerId>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|id| ContainerId::try_new(id).ok()))
}

/// A remote environment bound to a local source path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ContainerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(
        rename = "localPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local_path: Option<String>,
    #[serde(rename = "imageID", default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

/// Credentials needed to open an SSH-style session to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub address: String,
    pub user: String,
    pub password: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Container {
    pub fn address(&self) -> Option<&str> {
        non_empty(&self.address)
    }

    /// Returns `None` until address, user and password are all known.
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        Some(ConnectionInfo {
            address: non_empty(&self.address)?.to_string(),
            user: non_empty(&self.user)?.to_string(),
            password: non_empty(&self.password)?.to_string(),
        })
    }

    /// Replaces this container with a finalized copy pushed by the server.
    ///
    /// The pushed copy may omit the id; the id assigned at creation is kept then.
    pub fn finalize(&mut self, pushed: Container) {
        let id = pushed.id.or_else(|| self.id.take());
        *self = Container { id, ..pushed };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docker,
    Shell,
}

impl ExportFormat {
    pub fn detail(self) -> &'static str {
        match self {
            ExportFormat::Docker => {
                "The copied text will download the exported container and pipe it into docker load. To learn more visit http://bowery.io/docs/deployment"
            }
            ExportFormat::Shell => {
                "Paste the copied text into a file. Executing that file will mount the exported container using chroot. To learn more visit http://bowery.io/docs/deployment"
            }
        }
    }
}

/// Reply of `GET /env/{address}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvExport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub docker: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
}

impl EnvExport {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn payload(&self, format: ExportFormat) -> Option<&str> {
        match format {
            ExportFormat::Docker => self.docker.as_deref(),
            ExportFormat::Shell => self.shell.as_deref(),
        }
    }
}
