//! Commands typed into the `run` console.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::MenuCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// New environment for a local directory.
    New(PathBuf),
    /// One of the gated session commands, against `address` or the topmost session.
    Menu {
        command: MenuCommand,
        address: Option<String>,
    },
    Close(Option<String>),
    Delete(Option<String>),
    /// Closes every open info window.
    Dismiss,
    List,
    Status,
    Pause,
    Resume,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid quoting: {0}")]
    Quoting(String),

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
Commands:
  open <path>        create an environment for a local directory
  browse [address]   open the environment in a browser
  folder [address]   open the project directory in a file manager
  info [address]     show connection details
  dismiss            close open info windows
  save [address]     save the environment
  export [address]   save, then copy an export command
  close [address]    close the session (asks to save)
  delete [address]   delete without saving
  list               list sessions and windows
  status             show the sync status line
  pause | resume     pause or resume file sync
  help               show this help
  quit               stop the daemon and exit";

impl ConsoleCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let words = shell_words::split(line).map_err(|e| ParseError::Quoting(e.to_string()))?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };
        let address = || optional_arg(args);

        let command = match name.to_ascii_lowercase().as_str() {
            "open" | "new" => match args {
                [path] => ConsoleCommand::New(PathBuf::from(path)),
                _ => return Err(ParseError::Usage("open <path>")),
            },
            "browse" => ConsoleCommand::Menu {
                command: MenuCommand::Open,
                address: address()?,
            },
            other => match MenuCommand::parse(other).filter(|c| *c != MenuCommand::Open) {
                Some(command) => ConsoleCommand::Menu {
                    command,
                    address: address()?,
                },
                None => match other {
                    "close" => ConsoleCommand::Close(address()?),
                    "delete" => ConsoleCommand::Delete(address()?),
                    "dismiss" => ConsoleCommand::Dismiss,
                    "list" | "ls" => ConsoleCommand::List,
                    "status" => ConsoleCommand::Status,
                    "pause" => ConsoleCommand::Pause,
                    "resume" => ConsoleCommand::Resume,
                    "help" | "?" => ConsoleCommand::Help,
                    "quit" | "exit" => ConsoleCommand::Quit,
                    _ => return Err(ParseError::Unknown(name.clone())),
                },
            },
        };
        Ok(Some(command))
    }
}

fn optional_arg(args: &[String]) -> Result<Option<String>, ParseError> {
    match args {
        [] => Ok(None),
        [address] => Ok(Some(address.clone())),
        _ => Err(ParseError::Usage("<command> [address]")),
    }
}
