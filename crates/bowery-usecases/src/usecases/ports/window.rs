use std::fmt;

use crate::domain::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Session,
    Info,
}

impl WindowKind {
    pub fn default_title(self) -> &'static str {
        match self {
            WindowKind::Session => "Bowery",
            WindowKind::Info => "info",
        }
    }
}

/// Native window surface. Close requests and closes come back to the event loop as
/// window events tagged with the id returned from `open_window`.
pub trait WindowHost: Send + Sync {
    fn open_window(&self, kind: WindowKind) -> WindowId;

    fn navigate(&self, window: WindowId, view: &View);

    fn set_title(&self, window: WindowId, title: &str);

    /// Ignore title changes requested by the page from now on.
    fn pin_title(&self, window: WindowId);

    /// Tells the page that a close it requested was canceled.
    fn notify_canceled(&self, window: WindowId);

    fn destroy(&self, window: WindowId);

    fn open_external(&self, url: &str);
}
