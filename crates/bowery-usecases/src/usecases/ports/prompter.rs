//! Modal questions and notices shown to the user.

use super::window::WindowId;
use crate::domain::ExportFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseChoice {
    Save,
    DontSave,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    InsufficientPermissions,
    Copied(ExportFormat),
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::InsufficientPermissions => "Insufficient Permissions",
            Notice::Copied(_) => "Copied to clipboard!",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Notice::InsufficientPermissions => {
                "You do not have permission to save this environment. Contact your project owner for assistance."
            }
            Notice::Copied(format) => format.detail(),
        }
    }
}

pub const DOCKERFILE_QUESTION: &str = "Would you like to use the Dockerfile as the base image?";
pub const DOCKERFILE_DETAIL: &str = "If you choose yes, the Dockerfile is used as the base image rather than a base Bowery provides.";
pub const CLOSE_QUESTION: &str = "Do you want to save the changes you made to this environment?";
pub const CLOSE_DETAIL: &str = "Your changes will be lost if you don't save them.";
pub const EXPORT_QUESTION: &str = "Select a format to export to.";
pub const EXPORT_DETAIL: &str = "You can pipe this container into docker load or download and mount it directly without Docker.";

pub trait Prompter: Send + Sync {
    /// Yes/No: use the project's Dockerfile as the base image.
    fn confirm_dockerfile(&self) -> bool;

    fn confirm_close(&self, window: WindowId) -> CloseChoice;

    /// `None` means Cancel.
    fn choose_export_format(&self, window: Option<WindowId>) -> Option<ExportFormat>;

    /// Non-blocking for the session; dismissed by the user.
    fn notify(&self, window: Option<WindowId>, notice: &Notice);
}
