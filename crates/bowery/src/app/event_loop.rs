//! The single thread that owns every session.
//!
//! Adapter threads (pub/sub reader, sync stream, daemon watcher, signal handler,
//! stdin reader) only send messages here. Sessions, the menu and the sync status
//! are touched by this loop alone.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel as channel;
use crossbeam_channel::Receiver;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::console::Console;
use super::console::ConsoleWindowHost;
use super::console_command::ConsoleCommand;
use super::console_command::HELP;
use crate::common::Colors;
use crate::common::mutex_lock_or_recover;
use crate::domain::ChannelMessage;
use crate::domain::MenuCommand;
use crate::domain::SESSION_COMMANDS;
use crate::domain::SyncFrame;
use crate::usecases::SyncStatusPresenter;
use crate::usecases::TerminalManager;
use crate::usecases::WindowEvent;
use crate::usecases::ports::Clock;
use crate::usecases::ports::RemoteApi;
use crate::usecases::ports::Sleeper;
use crate::usecases::ports::TerminalError;
use crate::usecases::ports::WindowKind;

const IDLE_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Channel(ChannelMessage),
    Sync(SyncFrame),
    DaemonExited(Option<i32>),
    Signal(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Quit,
    Signal(i32),
    DaemonExited(Option<i32>),
}

impl AppEvent {
    /// Events that end the client whether or not the loop is running yet.
    fn as_exit(&self) -> Option<LoopExit> {
        match self {
            AppEvent::DaemonExited(code) => Some(LoopExit::DaemonExited(*code)),
            AppEvent::Signal(signal) => Some(LoopExit::Signal(*signal)),
            AppEvent::Channel(_) | AppEvent::Sync(_) => None,
        }
    }
}

/// Pauses of the start-up health wait. Sleeps on the loop's event queue so a
/// signal or the daemon exiting ends the wait at once; anything else is kept
/// for the loop.
pub struct StartupSleeper<'a> {
    events: &'a Receiver<AppEvent>,
    exit: Mutex<Option<LoopExit>>,
    deferred: Mutex<Vec<AppEvent>>,
}

impl<'a> StartupSleeper<'a> {
    pub fn new(events: &'a Receiver<AppEvent>) -> Self {
        Self {
            events,
            exit: Mutex::new(None),
            deferred: Mutex::new(Vec::new()),
        }
    }

    pub fn take_exit(&self) -> Option<LoopExit> {
        mutex_lock_or_recover(&self.exit).take()
    }

    pub fn take_deferred(&self) -> Vec<AppEvent> {
        std::mem::take(&mut *mutex_lock_or_recover(&self.deferred))
    }
}

impl Sleeper for StartupSleeper<'_> {
    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.is_interrupted() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(event) => match event.as_exit() {
                    Some(exit) => {
                        info!(?exit, "Start-up interrupted");
                        *mutex_lock_or_recover(&self.exit) = Some(exit);
                    }
                    None => mutex_lock_or_recover(&self.deferred).push(event),
                },
                Err(_) => return,
            }
        }
    }

    fn is_interrupted(&self) -> bool {
        mutex_lock_or_recover(&self.exit).is_some()
    }
}

pub struct EventLoop {
    manager: TerminalManager,
    presenter: SyncStatusPresenter,
    remote: Arc<dyn RemoteApi>,
    windows: Arc<ConsoleWindowHost>,
    clock: Arc<dyn Clock>,
    console: Console,
    last_status: String,
}

impl EventLoop {
    pub fn new(
        manager: TerminalManager,
        remote: Arc<dyn RemoteApi>,
        windows: Arc<ConsoleWindowHost>,
        clock: Arc<dyn Clock>,
        console: Console,
    ) -> Self {
        let presenter = SyncStatusPresenter::new();
        let last_status = presenter.to_string();
        Self {
            manager,
            presenter,
            remote,
            windows,
            clock,
            console,
            last_status,
        }
    }

    pub fn manager(&self) -> &TerminalManager {
        &self.manager
    }

    pub fn presenter(&self) -> &SyncStatusPresenter {
        &self.presenter
    }

    /// Runs until quit, a termination signal or the daemon exiting. Closed input
    /// does not end the loop.
    pub fn run(&mut self, events: &Receiver<AppEvent>, lines: &Receiver<String>) -> LoopExit {
        let closed_input = channel::never();
        let mut input_open = true;
        loop {
            let timeout = self
                .presenter
                .next_deadline()
                .map_or(IDLE_TICK, |deadline| self.clock.until(deadline));
            let input = if input_open { lines } else { &closed_input };

            channel::select! {
                recv(events) -> event => match event {
                    Ok(event) => {
                        if let Some(exit) = self.handle_event(event) {
                            return exit;
                        }
                    }
                    Err(_) => {
                        warn!("Event senders dropped; leaving event loop");
                        return LoopExit::Quit;
                    }
                },
                recv(input) -> line => match line {
                    Ok(line) => {
                        if let Some(exit) = self.handle_line(&line) {
                            return exit;
                        }
                    }
                    Err(_) => {
                        info!("Console input closed; still serving sessions");
                        input_open = false;
                    }
                },
                default(timeout) => {}
            }
            self.tick();
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Option<LoopExit> {
        match event {
            AppEvent::Channel(message) => {
                let event = message.event.name();
                if let Err(err) = self.manager.handle_channel(message) {
                    warn!(event, error = %err, "Channel event failed");
                    self.report(&err);
                }
                None
            }
            AppEvent::Sync(frame) => {
                self.presenter.apply(&frame, self.clock.now());
                self.print_status_if_changed();
                None
            }
            AppEvent::DaemonExited(code) => {
                let code_text =
                    code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
                self.console.line(format!(
                    "{} Daemon exited with {code_text}.",
                    Colors::warning("warning:")
                ));
                Some(LoopExit::DaemonExited(code))
            }
            AppEvent::Signal(signal) => Some(LoopExit::Signal(signal)),
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Option<LoopExit> {
        match ConsoleCommand::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => None,
            Err(err) => {
                self.console.line(format!("{} {err}", Colors::error("error:")));
                None
            }
        }
    }

    /// Applies a due sync status reset.
    pub fn tick(&mut self) {
        if self.presenter.tick(self.clock.now()) {
            self.print_status_if_changed();
        }
    }

    fn execute(&mut self, command: ConsoleCommand) -> Option<LoopExit> {
        debug!(?command, "Console command");
        let result = match command {
            ConsoleCommand::New(path) => self.create(path),
            ConsoleCommand::Menu { command, address } => {
                self.manager.run_command(command, address.as_deref())
            }
            ConsoleCommand::Close(address) => self.manager.close(address.as_deref()),
            ConsoleCommand::Delete(address) => self.manager.delete(address.as_deref()),
            ConsoleCommand::Dismiss => self.dismiss_info_windows(),
            ConsoleCommand::List => {
                self.list();
                Ok(())
            }
            ConsoleCommand::Status => {
                self.status();
                Ok(())
            }
            ConsoleCommand::Pause => {
                self.set_paused(true);
                Ok(())
            }
            ConsoleCommand::Resume => {
                self.set_paused(false);
                Ok(())
            }
            ConsoleCommand::Help => {
                self.console.line(HELP);
                Ok(())
            }
            ConsoleCommand::Quit => return Some(LoopExit::Quit),
        };
        if let Err(err) = result {
            self.report(&err);
        }
        None
    }

    /// Creates an environment for `path`, reporting a failure on the console.
    pub fn open_path(&mut self, path: PathBuf) -> bool {
        match self.create(path) {
            Ok(()) => true,
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    fn create(&mut self, path: PathBuf) -> Result<(), TerminalError> {
        self.console
            .line(format!("Creating environment for {}...", path.display()));
        let id = self.manager.create(path)?;
        self.console.line(format!(
            "{} Container {id} created; waiting for it to launch.",
            Colors::success("✓")
        ));
        Ok(())
    }

    fn dismiss_info_windows(&mut self) -> Result<(), TerminalError> {
        let open = self.windows.windows_of(WindowKind::Info);
        if open.is_empty() {
            self.console.line(Colors::dim("No info windows are open."));
        }
        for window in open {
            self.manager
                .handle_window(window, WindowEvent::CloseRequested)?;
        }
        Ok(())
    }

    fn list(&self) {
        if self.manager.is_empty() {
            self.console.line(Colors::dim("No sessions."));
        }
        for terminal in self.manager.terminals() {
            let address = terminal.address().unwrap_or("-");
            let id = terminal
                .container_id()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            self.console.line(format!(
                "  {:<15} {:<10} {:<26} {}",
                Colors::address(address),
                terminal.state(),
                id,
                terminal.path().display()
            ));
        }
        let enabled: Vec<&str> = SESSION_COMMANDS
            .into_iter()
            .filter(|command| self.manager.menu().is_enabled(*command))
            .map(MenuCommand::label)
            .collect();
        if !enabled.is_empty() {
            self.console
                .line(Colors::dim(&format!("Available: {}", enabled.join(", "))));
        }
        for window in self.windows.windows() {
            self.console.line(Colors::dim(&format!(
                "  {} {:?} {}",
                window.id,
                window.kind,
                window.location.as_deref().unwrap_or("(blank)")
            )));
        }
    }

    fn status(&self) {
        self.console.line(&self.presenter);
        for item in self.presenter.items() {
            let marker = if item.alarm {
                Colors::error("!")
            } else {
                " ".to_string()
            };
            self.console.line(format!(
                "  {marker} {} {}",
                item.name,
                Colors::dim(item.local_path.as_deref().unwrap_or(""))
            ));
        }
    }

    fn set_paused(&mut self, pause: bool) {
        if self.presenter.is_paused() == pause {
            self.console.line(Colors::dim(if pause {
                "Syncing is already paused."
            } else {
                "Syncing is not paused."
            }));
            return;
        }
        match self.presenter.toggle(self.remote.as_ref()) {
            Ok(()) => self.print_status_if_changed(),
            Err(err) => {
                warn!(error = %err, "Failed to toggle sync");
                self.console.line(format!("{} {err}", Colors::error("error:")));
            }
        }
    }

    fn print_status_if_changed(&mut self) {
        let line = self.presenter.to_string();
        if line != self.last_status {
            self.console.line(&line);
            self.last_status = line;
        }
    }

    fn report(&self, err: &TerminalError) {
        self.console
            .line(format!("{} {err}", Colors::error("error:")));
        self.console
            .line(Colors::dim(&format!("Suggestion: {}", err.suggestion())));
    }
}
