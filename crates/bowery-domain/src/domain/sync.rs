//! File-sync status frames pushed over the daemon's `/_/ws` stream.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncApplication {
    #[serde(alias = "ID", alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "localPath", default)]
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Connect,
    Disconnect,
    Update,
    Create,
    Delete,
    UploadStart,
    UploadFinish,
    #[serde(other)]
    Unknown,
}

impl SyncStatus {
    /// File events show a transient message that later resets to "Up to date.".
    pub fn is_file_event(self) -> bool {
        matches!(
            self,
            SyncStatus::Update | SyncStatus::Create | SyncStatus::Delete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncFrame {
    pub application: SyncApplication,
    pub status: SyncStatus,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SyncFrame {
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }
}
