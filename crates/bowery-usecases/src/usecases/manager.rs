//! Registry of live sessions and the menu they share.

use std::path::PathBuf;

use tracing::debug;
use tracing::info;

use crate::domain::ChannelMessage;
use crate::domain::ContainerId;
use crate::domain::Menu;
use crate::domain::MenuCommand;
use crate::domain::MenuProperty;
use crate::domain::SESSION_COMMANDS;
use crate::usecases::ports::TerminalError;
use crate::usecases::ports::WindowId;
use crate::usecases::terminal::Lifecycle;
use crate::usecases::terminal::SessionContext;
use crate::usecases::terminal::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The user asked to close the window; it stays open until we destroy it.
    CloseRequested,
    Closed,
}

/// Sessions in insertion order; the last one is on top.
pub struct TerminalManager {
    terminals: Vec<Terminal>,
    menu: Menu,
    context: SessionContext,
}

impl TerminalManager {
    pub fn new(context: SessionContext, menu: Menu) -> Self {
        Self {
            terminals: Vec::new(),
            menu,
            context,
        }
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    /// Registers an unbound session for `path`.
    pub fn new_terminal(&mut self, path: impl Into<PathBuf>) -> &mut Terminal {
        let terminal = Terminal::new(path, self.context.clone());
        self.add(terminal)
    }

    pub fn add(&mut self, terminal: Terminal) -> &mut Terminal {
        let index = self.terminals.len();
        self.terminals.push(terminal);
        &mut self.terminals[index]
    }

    /// Removes the session bound to `id`. Sessions sharing a path are untouched.
    pub fn remove(&mut self, id: &ContainerId) -> Option<Terminal> {
        let index = self.position_by_container(id)?;
        let terminal = self.terminals.remove(index);
        self.refresh_menu();
        Some(terminal)
    }

    pub fn get(&self, id: &ContainerId) -> Option<&Terminal> {
        self.position_by_container(id).map(|i| &self.terminals[i])
    }

    /// First session whose container lives at `address`.
    pub fn get_by_ip(&self, address: &str) -> Option<&Terminal> {
        self.position_by_ip(address).map(|i| &self.terminals[i])
    }

    pub fn update_submenu_item(&mut self, top: &str, sub: &str, property: MenuProperty) -> usize {
        self.menu.update_submenu_item(top, sub, property)
    }

    fn position_by_container(&self, id: &ContainerId) -> Option<usize> {
        self.terminals
            .iter()
            .position(|t| t.container_id() == Some(id))
    }

    fn position_by_ip(&self, address: &str) -> Option<usize> {
        self.terminals
            .iter()
            .position(|t| t.address() == Some(address))
    }

    /// Session at `address`, or the topmost connected one.
    fn target(&self, address: Option<&str>) -> Result<usize, TerminalError> {
        match address {
            Some(address) => self
                .position_by_ip(address)
                .ok_or_else(|| TerminalError::NotFound(address.to_string())),
            None => self
                .terminals
                .iter()
                .rposition(Terminal::is_active)
                .ok_or_else(|| TerminalError::NotFound("any address".to_string())),
        }
    }

    /// Registers a session for `path` and creates its container. A failed create
    /// leaves nothing registered.
    pub fn create(&mut self, path: impl Into<PathBuf>) -> Result<ContainerId, TerminalError> {
        let index = self.terminals.len();
        self.new_terminal(path);
        match self.terminals[index].create() {
            Ok(id) => Ok(id),
            Err(err) => {
                self.terminals.remove(index);
                Err(err)
            }
        }
    }

    pub fn handle_channel(&mut self, message: ChannelMessage) -> Result<(), TerminalError> {
        let Some(index) = self.position_by_container(&message.container_id) else {
            debug!(
                container_id = %message.container_id,
                event = message.event.name(),
                "No session for channel message"
            );
            return Ok(());
        };
        let outcome = self.terminals[index].handle_event(message.event)?;
        self.apply(index, outcome);
        Ok(())
    }

    pub fn handle_window(&mut self, window: WindowId, event: WindowEvent) -> Result<(), TerminalError> {
        if let Some(index) = self.terminals.iter().position(|t| t.window() == Some(window)) {
            match event {
                WindowEvent::CloseRequested => {
                    let outcome = self.terminals[index].handle_window_close()?;
                    self.apply(index, outcome);
                }
                WindowEvent::Closed => debug!(%window, "Session window closed by host"),
            }
            return Ok(());
        }

        if let Some(index) = self
            .terminals
            .iter()
            .position(|t| t.info_window() == Some(window))
        {
            self.terminals[index].info_closed(&mut self.menu);
            self.refresh_menu();
            if event == WindowEvent::CloseRequested {
                self.context.windows.destroy(window);
            }
            return Ok(());
        }

        debug!(%window, ?event, "Event for unknown window");
        Ok(())
    }

    /// Runs a gated menu command against the session at `address` (or the topmost
    /// connected one).
    pub fn run_command(
        &mut self,
        command: MenuCommand,
        address: Option<&str>,
    ) -> Result<(), TerminalError> {
        if !self.menu.is_enabled(command) {
            return Err(TerminalError::CommandDisabled(command.label()));
        }
        let index = self.target(address)?;
        let terminal = &mut self.terminals[index];
        match command {
            MenuCommand::Open => terminal.open_in_browser(),
            MenuCommand::OpenFolder => terminal.open_in_file_manager(),
            MenuCommand::Info => terminal.info(&mut self.menu),
            MenuCommand::Save => terminal.save(),
            MenuCommand::Export => terminal.save_and_export(),
        }
    }

    /// Same as the user closing the session window.
    pub fn close(&mut self, address: Option<&str>) -> Result<(), TerminalError> {
        let index = self.target(address)?;
        let outcome = self.terminals[index].handle_window_close()?;
        self.apply(index, outcome);
        Ok(())
    }

    pub fn delete(&mut self, address: Option<&str>) -> Result<(), TerminalError> {
        let index = self.target(address)?;
        let outcome = self.terminals[index].delete()?;
        self.apply(index, outcome);
        Ok(())
    }

    /// Drops a closed session, then recomputes the menu from every session left.
    fn apply(&mut self, index: usize, outcome: Lifecycle) {
        if outcome == Lifecycle::Closed {
            let terminal = self.terminals.remove(index);
            info!(
                container_id = ?terminal.container_id(),
                path = %terminal.path().display(),
                remaining = self.terminals.len(),
                "Session closed"
            );
        }
        self.refresh_menu();
    }

    /// Session commands stay enabled while any session is connected. Info also
    /// needs every info window to be closed.
    fn refresh_menu(&mut self) {
        let connected = self.terminals.iter().any(Terminal::is_active);
        let info_open = self.terminals.iter().any(|t| t.info_window().is_some());
        for command in SESSION_COMMANDS {
            let enabled = connected && !(command == MenuCommand::Info && info_open);
            self.menu.set_enabled(command, enabled);
        }
    }
}
