use std::io;

use thiserror::Error;

use crate::infra::SupervisorError;
use crate::usecases::ports::ChannelError;
use crate::usecases::ports::RemoteError;
use crate::usecases::ports::TerminalError;

use super::exit_codes;

/// Errors that end a command. Each maps to a sysexits-style exit code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Daemon(#[from] SupervisorError),

    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Terminal(#[from] TerminalError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl AppError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        AppError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) => exit_codes::USAGE,
            AppError::Daemon(SupervisorError::NotRunning) => exit_codes::NOT_RUNNING,
            AppError::Daemon(_) | AppError::Channel(_) => exit_codes::UNAVAILABLE,
            AppError::Remote(err) if err.is_connectivity() => exit_codes::UNAVAILABLE,
            AppError::Remote(_) => exit_codes::IOERR,
            AppError::Terminal(TerminalError::Offline { .. }) => exit_codes::UNAVAILABLE,
            AppError::Terminal(_) | AppError::Io { .. } => exit_codes::IOERR,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            AppError::Usage(_) => Some("Run 'bowery --help' for usage.".to_string()),
            AppError::Daemon(err) => Some(err.suggestion()),
            AppError::Remote(err) if err.is_connectivity() => {
                Some("Check that the daemon is running: bowery daemon status".to_string())
            }
            AppError::Remote(_) => None,
            AppError::Channel(_) => {
                Some("Check your connection or set BOWERY_PUSHER_URL.".to_string())
            }
            AppError::Terminal(err) => Some(err.suggestion()),
            AppError::Io { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_uses_lsb_code() {
        let err = AppError::from(SupervisorError::NotRunning);
        assert_eq!(err.exit_code(), exit_codes::NOT_RUNNING);
    }

    #[test]
    fn test_remote_exit_codes_split_on_connectivity() {
        let unreachable = AppError::from(RemoteError::Transport {
            url: "http://localhost:32055/pause".into(),
            reason: "connection refused".into(),
        });
        let rejected = AppError::from(RemoteError::Rejected {
            message: "nope".into(),
        });

        assert_eq!(unreachable.exit_code(), exit_codes::UNAVAILABLE);
        assert!(unreachable.suggestion().is_some());
        assert_eq!(rejected.exit_code(), exit_codes::IOERR);
        assert_eq!(rejected.to_string(), "nope");
    }

    #[test]
    fn test_offline_terminal_error_is_unavailable() {
        let err = AppError::from(TerminalError::Offline {
            source: RemoteError::Transport {
                url: "http://localhost:32055/containers".into(),
                reason: "refused".into(),
            },
        });
        assert_eq!(err.exit_code(), exit_codes::UNAVAILABLE);
    }
}
