#![expect(clippy::print_stdout, reason = "CLI output is emitted here")]
#![expect(clippy::print_stderr, reason = "CLI output is emitted here")]

//! CLI application layer and composition root wiring.

use std::io;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::CommandFactory;
use clap::Parser;
use clap_complete::generate;
use crossbeam_channel as channel;
use crossbeam_channel::Receiver;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub mod commands;
pub mod console;
pub mod console_command;
pub mod error;
pub mod event_loop;

use crate::app::commands::Cli;
use crate::app::commands::Commands;
use crate::app::commands::DaemonCommand;
use crate::app::commands::RunArgs;
use crate::app::commands::SyncArgs;
use crate::app::console::Console;
use crate::app::console::ConsoleClipboard;
use crate::app::console::ConsolePrompter;
use crate::app::console::ConsoleWindowHost;
use crate::app::error::AppError;
use crate::app::event_loop::AppEvent;
use crate::app::event_loop::EventLoop;
use crate::app::event_loop::LoopExit;
use crate::app::event_loop::StartupSleeper;
use crate::common::Colors;
use crate::common::color_init;
use crate::common::telemetry;
use crate::domain::Menu;
use crate::domain::SyncFrame;
use crate::infra::ClientConfig;
use crate::infra::DaemonHandle;
use crate::infra::DaemonStatus;
use crate::infra::HttpRemoteClient;
use crate::infra::OsProcessController;
use crate::infra::PusherChannel;
use crate::infra::RealSleeper;
use crate::infra::SignalHandler;
use crate::infra::StopOutcome;
use crate::infra::Supervisor;
use crate::infra::SyncStream;
use crate::infra::SystemClock;
use crate::usecases::HealthOutcome;
use crate::usecases::HealthPolicy;
use crate::usecases::SessionContext;
use crate::usecases::SyncStatusPresenter;
use crate::usecases::TerminalManager;
use crate::usecases::await_healthy;
use crate::usecases::ports::Clock;
use crate::usecases::ports::HealthProbe;
use crate::usecases::ports::Sleeper;

const PROGRAM_NAME: &str = "bowery";
const SYNC_IDLE_TICK: Duration = Duration::from_secs(1);

/// Exit codes following sysexits.h and LSB init script conventions.
///
/// LSB init script exit codes for daemon status:
/// - 0: Program is running and OK
/// - 3: Program is not running
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    /// LSB: program is not running (for `daemon status`)
    pub const NOT_RUNNING: i32 = 3;
    pub const USAGE: i32 = 64;
    pub const UNAVAILABLE: i32 = 69;
    pub const IOERR: i32 = 74;
}

pub struct Application;

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self) -> Result<i32> {
        let exit_code = match self.execute() {
            Ok(code) => code,
            Err(e) => self.handle_error(e),
        };
        Ok(exit_code)
    }

    fn execute(&self) -> Result<i32> {
        let cli = Cli::parse();
        let _telemetry = telemetry::init_tracing(cli.verbose);
        color_init(cli.no_color);

        let mut config = ClientConfig::from_env();
        if let Some(port) = cli.port {
            config = config.with_port(port);
        }
        debug!(port = config.port(), temp_dir = %config.temp_dir().display(), "Resolved configuration");

        match cli.command_or_default() {
            Commands::Run(args) => run_client(config, args),
            Commands::Daemon(command) => handle_daemon_command(config, command),
            Commands::Health { attempts } => handle_health(&config, attempts),
            Commands::Sync(args) => handle_sync(&config, &args),
            Commands::Completions { shell } => {
                let mut cmd = Cli::command();
                generate(shell, &mut cmd, PROGRAM_NAME, &mut io::stdout());
                Ok(exit_codes::SUCCESS)
            }
        }
    }

    fn handle_error(&self, e: anyhow::Error) -> i32 {
        if let Some(app_error) = find_error::<AppError>(&e) {
            eprintln!("{}: {} {}", PROGRAM_NAME, Colors::error("Error:"), app_error);
            if let Some(suggestion) = app_error.suggestion() {
                eprintln!("{}", Colors::dim(&format!("Suggestion: {suggestion}")));
            }
            return app_error.exit_code();
        }

        eprintln!("{}: {} {}", PROGRAM_NAME, Colors::error("Error:"), e);
        exit_codes::GENERAL_ERROR
    }
}

fn find_error<T: std::error::Error + 'static>(error: &anyhow::Error) -> Option<&T> {
    error.chain().find_map(|source| source.downcast_ref::<T>())
}

fn remote_client(config: &ClientConfig) -> Result<Arc<HttpRemoteClient>, AppError> {
    Ok(Arc::new(HttpRemoteClient::new(&config.base_url())?))
}

/// Forwards stdin lines until EOF. The receiver is shared by the event loop and
/// the console prompter.
fn spawn_stdin_reader() -> Result<Receiver<String>, AppError> {
    let (tx, rx) = channel::unbounded();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("Console input reached EOF");
        })
        .map_err(|e| AppError::io("Failed to start the console reader", e))?;
    Ok(rx)
}

fn install_signal_handler(events: channel::Sender<AppEvent>) -> Option<SignalHandler> {
    match SignalHandler::setup(move |signal| {
        let _ = events.send(AppEvent::Signal(signal));
    }) {
        Ok(handler) => Some(handler),
        Err(err) => {
            warn!(error = %err, "Signal handling unavailable");
            eprintln!(
                "{} {err}\n{}",
                Colors::warning("Warning:"),
                Colors::dim(&format!("Suggestion: {}", err.suggestion()))
            );
            None
        }
    }
}

fn wait_for_daemon(
    probe: &dyn HealthProbe,
    sleeper: &dyn Sleeper,
    policy: HealthPolicy,
) -> HealthOutcome {
    let outcome = await_healthy(probe, sleeper, policy);
    if let HealthOutcome::TimedOut { attempts } = outcome {
        println!(
            "{} Daemon did not answer after {attempts} health checks; continuing.",
            Colors::warning("Warning:")
        );
    }
    outcome
}

fn print_stop_outcome(outcome: &StopOutcome) {
    for warning in &outcome.warnings {
        warn!(pid = outcome.pid, warning = %warning, "Daemon stop warning");
    }
    if outcome.forced {
        println!(
            "{} Daemon (PID {}) did not exit in time and was killed.",
            Colors::warning("⚠"),
            outcome.pid
        );
    }
}

/// A daemon spawned by `run`. Dropping the guard stops it, so no return path
/// leaves it running.
struct DaemonGuard<'a> {
    supervisor: &'a Supervisor<OsProcessController>,
    handle: Option<DaemonHandle>,
}

impl<'a> DaemonGuard<'a> {
    fn new(supervisor: &'a Supervisor<OsProcessController>, handle: DaemonHandle) -> Self {
        Self {
            supervisor,
            handle: Some(handle),
        }
    }

    fn stop(mut self) -> Option<StopOutcome> {
        let handle = self.handle.take()?;
        Some(self.supervisor.shutdown(&handle))
    }
}

impl Drop for DaemonGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let outcome = self.supervisor.shutdown(&handle);
            warn!(pid = outcome.pid, forced = outcome.forced, "Daemon stopped on early exit");
        }
    }
}

/// `bowery run`: supervise the daemon and serve sessions until quit.
fn run_client(config: ClientConfig, args: RunArgs) -> Result<i32> {
    let console = Console::stdout();
    let working_dir = std::env::current_dir()
        .map_err(|e| AppError::io("Failed to read the current directory", e))?;
    let remote = remote_client(&config)?;
    let pusher_url = config
        .pusher_url()
        .map_err(|e| AppError::Usage(format!("Invalid pub/sub URL: {e}")))?;
    let lines = spawn_stdin_reader()?;

    let (event_tx, event_rx) = channel::unbounded::<AppEvent>();
    let _signals = install_signal_handler(event_tx.clone());

    let supervisor = Supervisor::new(config.clone(), OsProcessController);
    let daemon = if args.no_daemon {
        info!("Using an already running daemon");
        None
    } else {
        if let Some(pid) = supervisor.recover_stale() {
            console.line(Colors::dim(&format!("Stopped a daemon left behind (PID {pid}).")));
        }
        let exit_tx = event_tx.clone();
        let handle = supervisor
            .start(&working_dir, move |code| {
                let _ = exit_tx.send(AppEvent::DaemonExited(code));
            })
            .map_err(AppError::from)?;
        Some(DaemonGuard::new(&supervisor, handle))
    };

    let startup = StartupSleeper::new(&event_rx);
    wait_for_daemon(remote.as_ref(), &startup, config.health_policy());

    let exit = if let Some(exit) = startup.take_exit() {
        drop(event_tx);
        exit
    } else {
        let channel_tx = event_tx.clone();
        let pusher = Arc::new(PusherChannel::new(
            pusher_url,
            Arc::new(move |message| {
                let _ = channel_tx.send(AppEvent::Channel(message));
            }),
        ));

        let sync_tx = event_tx.clone();
        let sync_stream = match config.sync_ws_url() {
            Ok(url) => match SyncStream::connect(
                &url,
                Arc::new(move |frame| {
                    let _ = sync_tx.send(AppEvent::Sync(frame));
                }),
            ) {
                Ok(stream) => Some(stream),
                Err(err) => {
                    warn!(error = %err, "Sync status unavailable");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "Invalid sync stream URL");
                None
            }
        };
        drop(event_tx);

        let windows = Arc::new(ConsoleWindowHost::new(console.clone()));
        let context = SessionContext {
            remote: remote.clone(),
            channel: pusher.clone(),
            windows: windows.clone(),
            prompter: Arc::new(ConsolePrompter::new(console.clone(), lines.clone())),
            clipboard: Arc::new(ConsoleClipboard::new(console.clone())),
        };
        let manager = TerminalManager::new(context, Menu::with_session_commands());
        let mut event_loop = EventLoop::new(
            manager,
            remote,
            windows,
            Arc::new(SystemClock::new()),
            console.clone(),
        );

        console.line(format!(
            "{} Bowery is running. Type {} for commands.",
            Colors::success("✓"),
            Colors::bold("help")
        ));
        let early_exit = startup
            .take_deferred()
            .into_iter()
            .find_map(|event| event_loop.handle_event(event));
        let exit = match early_exit {
            Some(exit) => exit,
            None => {
                for path in args.paths {
                    event_loop.open_path(path);
                }
                event_loop.run(&event_rx, &lines)
            }
        };
        drop(event_loop);
        if let Some(mut stream) = sync_stream {
            stream.stop();
        }
        pusher.shutdown();
        exit
    };
    info!(?exit, "Shutting down");

    if let Some(outcome) = daemon.and_then(DaemonGuard::stop) {
        print_stop_outcome(&outcome);
    }
    Ok(match exit {
        LoopExit::DaemonExited(code) => code.unwrap_or(exit_codes::GENERAL_ERROR),
        LoopExit::Quit | LoopExit::Signal(_) => exit_codes::SUCCESS,
    })
}

fn handle_daemon_command(config: ClientConfig, command: DaemonCommand) -> Result<i32> {
    let supervisor = Supervisor::new(config.clone(), OsProcessController);
    match command {
        DaemonCommand::Start => {
            if let DaemonStatus::Running { pid, .. } = supervisor.status() {
                println!("Daemon is already running (PID {pid})");
                return Ok(exit_codes::SUCCESS);
            }
            supervisor.recover_stale();
            let working_dir = std::env::current_dir()
                .map_err(|e| AppError::io("Failed to read the current directory", e))?;
            let handle = supervisor
                .start(&working_dir, |code| debug!(?code, "Daemon exited"))
                .map_err(AppError::from)?;
            let remote = remote_client(&config)?;
            match wait_for_daemon(remote.as_ref(), &RealSleeper, config.health_policy()) {
                HealthOutcome::Ready { .. } => {
                    println!(
                        "{} Daemon started (PID {})",
                        Colors::success("✓"),
                        handle.pid()
                    );
                    Ok(exit_codes::SUCCESS)
                }
                HealthOutcome::TimedOut { .. } | HealthOutcome::Interrupted { .. } => {
                    Ok(exit_codes::UNAVAILABLE)
                }
            }
        }
        DaemonCommand::Stop => {
            let outcome = supervisor.stop().map_err(AppError::from)?;
            print_stop_outcome(&outcome);
            println!(
                "{} Daemon stopped (PID {})",
                Colors::success("✓"),
                outcome.pid
            );
            Ok(exit_codes::SUCCESS)
        }
        DaemonCommand::Status => print_daemon_status(&config, supervisor.status()),
    }
}

fn print_daemon_status(config: &ClientConfig, status: DaemonStatus) -> Result<i32> {
    match status {
        DaemonStatus::NotRecorded => {
            println!("{} Daemon is not running", Colors::dim("●"));
            Ok(exit_codes::NOT_RUNNING)
        }
        DaemonStatus::Stale { pid } => {
            println!(
                "{} Daemon is not running (stale PID {pid})",
                Colors::warning("●")
            );
            Ok(exit_codes::NOT_RUNNING)
        }
        DaemonStatus::Running { pid, working_dir } => {
            println!("{} Daemon is running (PID {pid})", Colors::success("●"));
            if let Some(dir) = working_dir {
                println!("  Working directory: {}", dir.display());
            }
            let health = match remote_client(config)?.probe() {
                Ok(()) => Colors::success("healthy"),
                Err(err) => {
                    debug!(error = %err, "Health probe failed");
                    Colors::warning("not responding")
                }
            };
            println!("  Endpoint: {} ({health})", Colors::address(&config.base_url()));
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn handle_health(config: &ClientConfig, attempts: Option<u32>) -> Result<i32> {
    let policy = match attempts {
        Some(max_attempts) => HealthPolicy {
            max_attempts,
            ..config.health_policy()
        },
        None => config.health_policy(),
    };
    let remote = remote_client(config)?;
    match await_healthy(remote.as_ref(), &RealSleeper, policy) {
        HealthOutcome::Ready { attempts } => {
            println!(
                "{} Daemon is healthy at {} ({attempts} check{})",
                Colors::success("✓"),
                Colors::address(&config.base_url()),
                if attempts == 1 { "" } else { "s" }
            );
            Ok(exit_codes::SUCCESS)
        }
        HealthOutcome::TimedOut { attempts } | HealthOutcome::Interrupted { attempts } => {
            println!(
                "{} Daemon at {} did not answer after {attempts} checks",
                Colors::error("✗"),
                Colors::address(&config.base_url())
            );
            Ok(exit_codes::UNAVAILABLE)
        }
    }
}

fn handle_sync(config: &ClientConfig, args: &SyncArgs) -> Result<i32> {
    let remote = remote_client(config)?;
    if args.pause || args.resume {
        let mut presenter = SyncStatusPresenter::new();
        if args.resume {
            presenter.pause();
        }
        presenter.toggle(remote.as_ref()).map_err(AppError::from)?;
        println!("{presenter}");
        return Ok(exit_codes::SUCCESS);
    }

    let url = config
        .sync_ws_url()
        .map_err(|e| AppError::Usage(format!("Invalid sync stream URL: {e}")))?;
    let (frame_tx, frame_rx) = channel::unbounded::<SyncFrame>();
    let mut stream = SyncStream::connect(
        &url,
        Arc::new(move |frame| {
            let _ = frame_tx.send(frame);
        }),
    )
    .map_err(AppError::from)?;

    let (signal_tx, signal_rx) = channel::unbounded();
    let _signals = SignalHandler::setup(move |signal| {
        let _ = signal_tx.send(signal);
    })
    .map_err(AppError::from)?;

    let exit = follow_sync(&frame_rx, &signal_rx, &SystemClock::new(), |line| {
        println!("{line}");
    });
    stream.stop();
    Ok(exit)
}

/// Prints the status line whenever it changes, until the stream ends or a signal
/// arrives.
fn follow_sync(
    frames: &Receiver<SyncFrame>,
    signals: &Receiver<i32>,
    clock: &dyn Clock,
    mut print: impl FnMut(&str),
) -> i32 {
    let mut presenter = SyncStatusPresenter::new();
    let mut last = presenter.to_string();
    print(&last);
    loop {
        let timeout = presenter
            .next_deadline()
            .map_or(SYNC_IDLE_TICK, |deadline| clock.until(deadline));
        channel::select! {
            recv(frames) -> frame => match frame {
                Ok(frame) => presenter.apply(&frame, clock.now()),
                Err(_) => {
                    info!("Sync stream ended");
                    return exit_codes::SUCCESS;
                }
            },
            recv(signals) -> _ => return exit_codes::SUCCESS,
            default(timeout) => {}
        }
        presenter.tick(clock.now());
        let line = presenter.to_string();
        if line != last {
            print(&line);
            last = line;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::SupervisorError;
    use crate::usecases::ports::RemoteError;
    use crate::usecases::ports::test_support::MockClock;

    #[test]
    fn test_handle_error_uses_app_error_exit_code() {
        let app = Application::new();

        let not_running = anyhow::Error::new(AppError::from(SupervisorError::NotRunning));
        assert_eq!(app.handle_error(not_running), exit_codes::NOT_RUNNING);

        let usage = anyhow::Error::new(AppError::Usage("bad".into()));
        assert_eq!(app.handle_error(usage), exit_codes::USAGE);
    }

    #[test]
    fn test_handle_error_finds_wrapped_app_error() {
        let app = Application::new();
        let err = anyhow::Error::new(AppError::from(RemoteError::Transport {
            url: "http://localhost:32055/healthz".into(),
            reason: "refused".into(),
        }))
        .context("checking daemon");

        assert_eq!(app.handle_error(err), exit_codes::UNAVAILABLE);
    }

    #[test]
    fn test_handle_error_defaults_to_general_error() {
        let app = Application::new();
        assert_eq!(
            app.handle_error(anyhow::anyhow!("something else")),
            exit_codes::GENERAL_ERROR
        );
    }

    #[test]
    fn test_follow_sync_prints_changes_until_stream_ends() {
        let (frame_tx, frame_rx) = channel::unbounded();
        let (_signal_tx, signal_rx) = channel::unbounded();
        frame_tx
            .send(
                serde_json::from_str(
                    r#"{"application":{"id":"a1","name":"web"},"status":"upload-start"}"#,
                )
                .unwrap(),
            )
            .unwrap();
        drop(frame_tx);
        let mut printed = Vec::new();

        let code = follow_sync(&frame_rx, &signal_rx, &MockClock::new(), |line| {
            printed.push(line.to_string());
        });

        assert_eq!(code, exit_codes::SUCCESS);
        assert_eq!(printed.first().map(String::as_str), Some("[check] Up to date."));
        assert_eq!(printed.len(), 2);
    }

    #[test]
    fn test_follow_sync_stops_on_signal() {
        let (_frame_tx, frame_rx) = channel::unbounded::<SyncFrame>();
        let (signal_tx, signal_rx) = channel::unbounded();
        signal_tx.send(2).unwrap();

        let code = follow_sync(&frame_rx, &signal_rx, &MockClock::new(), |_| {});

        assert_eq!(code, exit_codes::SUCCESS);
    }
}
