//! CLI command parsing.

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueHint;
pub use clap_complete::Shell;

const LONG_ABOUT: &str = "\
Launch the local Bowery daemon and work with remote development environments.\n\
\n\
`bowery run <PATH>` starts the daemon, creates an environment for each path and\n\
keeps a console open for saving, exporting and deleting them.";

const AFTER_LONG_HELP: &str = r#"CONSOLE COMMANDS (during `run`):
    open <path>             Create an environment for a local directory
    save [address]          Save the environment
    export [address]        Save, then copy an export command to the clipboard
    info [address]          Show connection details
    browse [address]        Open the environment in a browser
    folder [address]        Open the project directory in a file manager
    close [address]         Close the session window (asks to save)
    delete [address]        Delete the environment without saving
    list                    List sessions and windows
    status                  Show the sync status line
    pause | resume          Pause or resume file sync
    quit                    Stop the daemon and exit

CONFIGURATION:
    BOWERY_PORT                 Daemon port (default: 32055)
    BOWERY_BIN_DIR              Directory holding the client and updater binaries
    BOWERY_INSTALL_DIR          Install root passed to the updater
    BOWERY_USE_UPDATER          Launch the daemon through the updater (default: if present)
    BOWERY_VERSION_URL          Version manifest checked by the updater
    BOWERY_DAEMON_LOG           Send daemon output to this file instead of the console
    BOWERY_HEALTH_ATTEMPTS      Health checks before giving up (default: 15)
    BOWERY_HEALTH_INTERVAL_MS   Delay between health checks (default: 1500)
    BOWERY_PUSHER_KEY           Pub/sub application key
    BOWERY_PUSHER_URL           Full pub/sub WebSocket URL override
    BOWERY_TMPDIR               Directory for the pid and working-dir markers
    BOWERY_BROWSER              Browser command used by `browse`
    BOWERY_LOG                  Log file path (optional)
    BOWERY_LOG_FORMAT           Log format (text or json; default: text)
    BOWERY_LOG_STREAM           Log output stream (stderr or stdout; default: stderr)

EXAMPLES:
    bowery run ~/src/api
    bowery daemon status
    bowery health --attempts 3
    bowery sync --pause"#;

#[derive(Debug, Parser)]
#[command(name = "bowery")]
#[command(author, version, propagate_version = true)]
#[command(about = "Desktop client for Bowery development environments")]
#[command(long_about = LONG_ABOUT)]
#[command(after_long_help = AFTER_LONG_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Daemon port (overrides BOWERY_PORT)
    #[arg(long, global = true, value_name = "PORT")]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output (also respects NO_COLOR)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub no_color: bool,
}

impl Cli {
    /// `bowery` with no subcommand behaves like `bowery run`.
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Start the daemon and open environments for the given paths
    #[command(after_long_help = "\
EXAMPLES:
    bowery run
    bowery run ~/src/api ~/src/web
    bowery run --no-daemon .")]
    Run(RunArgs),

    /// Manage the local daemon process
    #[command(subcommand)]
    Daemon(DaemonCommand),

    /// Wait until the daemon answers its health check
    Health {
        /// Number of checks before giving up (overrides BOWERY_HEALTH_ATTEMPTS)
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,
    },

    /// Follow the file sync status, or pause/resume syncing
    Sync(SyncArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Local project directories to create environments for
    #[arg(value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub paths: Vec<PathBuf>,

    /// Use an already running daemon instead of starting one
    #[arg(long)]
    pub no_daemon: bool,
}

#[derive(Debug, Clone, Default, Args)]
#[group(multiple = false)]
pub struct SyncArgs {
    /// Pause file sync
    #[arg(long)]
    pub pause: bool,

    /// Resume file sync
    #[arg(long)]
    pub resume: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background and wait for it to become healthy
    Start,

    /// Stop the daemon recorded in the marker files
    Stop,

    /// Show the recorded daemon and whether it is alive
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["bowery"]).unwrap();

        match cli.command_or_default() {
            Commands::Run(args) => {
                assert!(args.paths.is_empty());
                assert!(!args.no_daemon);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_run_collects_paths() {
        let cli = Cli::try_parse_from(["bowery", "run", "/src/a", "/src/b", "--no-daemon"]).unwrap();

        let Commands::Run(args) = cli.command_or_default() else {
            panic!("expected run");
        };
        assert_eq!(args.paths, vec![PathBuf::from("/src/a"), PathBuf::from("/src/b")]);
        assert!(args.no_daemon);
    }

    #[test]
    fn test_global_port_flag() {
        let cli = Cli::try_parse_from(["bowery", "daemon", "status", "--port", "40000"]).unwrap();

        assert_eq!(cli.port, Some(40000));
        assert!(matches!(cli.command_or_default(), Commands::Daemon(DaemonCommand::Status)));
    }

    #[test]
    fn test_sync_pause_and_resume_conflict() {
        assert!(Cli::try_parse_from(["bowery", "sync", "--pause", "--resume"]).is_err());
    }
}
