use thiserror::Error;

use crate::domain::TerminalState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Failed to reach daemon at {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The daemon answered with a non-empty `error` field.
    #[error("{message}")]
    Rejected { message: String },

    #[error("Daemon returned HTTP {status} for {method} {path}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("Invalid response from daemon: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, RemoteError::Transport { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, RemoteError::Rejected { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport { .. } => true,
            RemoteError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Failed to connect to event channel at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Event channel closed")]
    Closed,

    #[error("Event channel protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("an active container is required")]
    NoContainer,

    #[error("container {0} has no connection details yet")]
    MissingCredentials(String),

    #[error("You must be connected to the internet to create an environment.")]
    Offline {
        #[source]
        source: RemoteError,
    },

    #[error("Cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: TerminalState,
    },

    #[error("No session is connected to {0}")]
    NotFound(String),

    #[error("{0} is not available right now")]
    CommandDisabled(&'static str),

    #[error("Cannot open {} in a file manager", .0.display())]
    LocalPath(std::path::PathBuf),

    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    Channel(#[from] ChannelError),
}

impl TerminalError {
    pub fn suggestion(&self) -> String {
        match self {
            TerminalError::NoContainer | TerminalError::MissingCredentials(_) => {
                "Wait for the environment to finish launching, then try again.".to_string()
            }
            TerminalError::Offline { .. } => {
                "Check your connection and make sure the Bowery daemon is running: bowery daemon status"
                    .to_string()
            }
            TerminalError::InvalidState { .. } => {
                "Wait for the current operation to finish, then try again.".to_string()
            }
            TerminalError::NotFound(_) => {
                "Run 'list' to see the addresses of open sessions.".to_string()
            }
            TerminalError::CommandDisabled(_) => {
                "This command is enabled once an environment is connected.".to_string()
            }
            TerminalError::LocalPath(_) => {
                "Check that the project directory still exists.".to_string()
            }
            TerminalError::Remote(err) if err.is_connectivity() => {
                "Check that the daemon is running: bowery daemon status".to_string()
            }
            TerminalError::Remote(_) => "Retry the operation.".to_string(),
            TerminalError::Channel(_) => {
                "Check your connection; lifecycle events could not be received.".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            TerminalError::Offline { .. } | TerminalError::Channel(_) => true,
            TerminalError::Remote(err) => err.is_retryable(),
            _ => false,
        }
    }
}
