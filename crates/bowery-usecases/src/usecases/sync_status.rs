//! Sync status line and per-application alarms, driven by `/_/ws` frames.

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::warn;

use crate::domain::SyncApplication;
use crate::domain::SyncFrame;
use crate::domain::SyncStatus;
use crate::usecases::ports::RemoteApi;
use crate::usecases::ports::RemoteError;

/// How long a file event message stays before the line returns to "Up to date.".
pub const RESET_DELAY: Duration = Duration::from_millis(750);
pub const UP_TO_DATE: &str = "Up to date.";
pub const PAUSED: &str = "Syncing paused.";

/// The pause toggle. `Check` means syncing and offers a pause; `Play` offers a
/// resume. Only pausing, resuming and reaching "Up to date." change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIcon {
    Check,
    Play,
}

impl SyncIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncIcon::Check => "check",
            SyncIcon::Play => "play",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub id: String,
    pub name: String,
    pub local_path: Option<String>,
    pub alarm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SyncFailure {
    app_id: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct SyncStatusPresenter {
    message: String,
    icon: SyncIcon,
    failure: Option<SyncFailure>,
    items: Vec<SyncItem>,
    reset_at: Option<Instant>,
    paused: bool,
}

impl Default for SyncStatusPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusPresenter {
    pub fn new() -> Self {
        Self {
            message: UP_TO_DATE.to_string(),
            icon: SyncIcon::Check,
            failure: None,
            items: Vec::new(),
            reset_at: None,
            paused: false,
        }
    }

    /// The status line. A sync error outranks every other message.
    pub fn message(&self) -> &str {
        match &self.failure {
            Some(failure) => &failure.message,
            None => &self.message,
        }
    }

    pub fn icon(&self) -> SyncIcon {
        self.icon
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn items(&self) -> &[SyncItem] {
        &self.items
    }

    pub fn item(&self, app_id: &str) -> Option<&SyncItem> {
        self.items.iter().find(|item| item.id == app_id)
    }

    pub fn is_alarmed(&self, app_id: &str) -> bool {
        self.item(app_id).is_some_and(|item| item.alarm)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.reset_at
    }

    fn upsert(&mut self, app: &SyncApplication) -> &mut SyncItem {
        let index = match self.items.iter().position(|item| item.id == app.id) {
            Some(index) => index,
            None => {
                self.items.push(SyncItem {
                    id: app.id.clone(),
                    name: app.name.clone(),
                    local_path: app.local_path.clone(),
                    alarm: false,
                });
                self.items.len() - 1
            }
        };
        let item = &mut self.items[index];
        if !app.name.is_empty() {
            item.name = app.name.clone();
        }
        if app.local_path.is_some() {
            item.local_path = app.local_path.clone();
        }
        item
    }

    fn show(&mut self, message: String, reset_at: Option<Instant>) {
        if self.paused {
            debug!(%message, "Sync paused; status message suppressed");
            return;
        }
        self.message = message;
        self.reset_at = reset_at;
    }

    fn up_to_date(&mut self) {
        self.show(UP_TO_DATE.to_string(), None);
        if !self.paused {
            self.icon = SyncIcon::Check;
        }
    }

    pub fn apply(&mut self, frame: &SyncFrame, now: Instant) {
        let app_id = frame.application.id.clone();
        let item = self.upsert(&frame.application);
        match frame.status {
            SyncStatus::Connect => item.alarm = false,
            SyncStatus::Disconnect => item.alarm = true,
            _ => {}
        }

        if let Some(error) = frame.error() {
            item.alarm = true;
            let name = if item.name.is_empty() {
                item.id.clone()
            } else {
                item.name.clone()
            };
            warn!(app_id = %app_id, error, "Sync error");
            self.failure = Some(SyncFailure {
                app_id,
                message: format!("{name}: {error}"),
            });
            return;
        }
        if self
            .failure
            .as_ref()
            .is_some_and(|failure| failure.app_id == app_id)
        {
            self.failure = None;
        }

        let path = frame.path.as_deref().unwrap_or_default();
        let name = frame.application.name.clone();
        let reset_at = Some(now + RESET_DELAY);
        match frame.status {
            SyncStatus::Update => self.show(format!("Updated {path}."), reset_at),
            SyncStatus::Create => self.show(format!("Created {path}."), reset_at),
            SyncStatus::Delete => self.show(format!("Deleted {path}."), reset_at),
            SyncStatus::UploadStart => self.show(format!("Uploading {name}."), None),
            SyncStatus::UploadFinish => self.up_to_date(),
            SyncStatus::Connect | SyncStatus::Disconnect => {}
            SyncStatus::Unknown => debug!(app_id = %app_id, "Unknown sync status"),
        }
    }

    /// Applies a due reset. Returns true when the line changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.reset_at {
            Some(deadline) if deadline <= now => {
                self.up_to_date();
                true
            }
            _ => false,
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.reset_at = None;
        self.message = PAUSED.to_string();
        self.icon = SyncIcon::Play;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.up_to_date();
    }

    /// Pauses or resumes syncing on the daemon, then updates the line.
    ///
    /// The line is left alone when the daemon refuses.
    pub fn toggle(&mut self, remote: &dyn RemoteApi) -> Result<(), RemoteError> {
        if self.paused {
            remote.resume_sync()?;
            self.resume();
        } else {
            remote.pause_sync()?;
            self.pause();
        }
        Ok(())
    }
}

impl fmt::Display for SyncStatusPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.icon.as_str(), self.message())
    }
}
