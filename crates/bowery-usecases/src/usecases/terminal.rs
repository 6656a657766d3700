//! One container session: path, create, launch, connect, save, export, delete.
//!
//! A `Terminal` never calls back into its manager. Operations that need the menu
//! take it as an argument, and operations that may end the session return a
//! [`Lifecycle`] the manager applies.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::domain::ChannelEvent;
use crate::domain::Container;
use crate::domain::ContainerId;
use crate::domain::FILE_MENU;
use crate::domain::Menu;
use crate::domain::MenuCommand;
use crate::domain::MenuProperty;
use crate::domain::ProgressKind;
use crate::domain::TerminalState;
use crate::domain::View;
use crate::usecases::ports::Clipboard;
use crate::usecases::ports::CloseChoice;
use crate::usecases::ports::EventChannel;
use crate::usecases::ports::Notice;
use crate::usecases::ports::Prompter;
use crate::usecases::ports::RemoteApi;
use crate::usecases::ports::RemoteError;
use crate::usecases::ports::Subscription;
use crate::usecases::ports::TerminalError;
use crate::usecases::ports::WindowHost;
use crate::usecases::ports::WindowId;
use crate::usecases::ports::WindowKind;

pub const BOWERY_CONFIG_FILE: &str = ".bowery";
pub const DOCKERFILE: &str = "Dockerfile";

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionContext {
    pub remote: Arc<dyn RemoteApi>,
    pub channel: Arc<dyn EventChannel>,
    pub windows: Arc<dyn WindowHost>,
    pub prompter: Arc<dyn Prompter>,
    pub clipboard: Arc<dyn Clipboard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Alive,
    /// The container is gone and the windows are destroyed; drop the session.
    Closed,
}

/// What to do once the channel reports `saved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterSave {
    Reconnect,
    Delete,
    Export,
}

const CONTAINER_STATES: [TerminalState; 4] = [
    TerminalState::Launching,
    TerminalState::Connected,
    TerminalState::Saving,
    TerminalState::Exporting,
];

pub struct Terminal {
    path: PathBuf,
    container: Option<Container>,
    state: TerminalState,
    active: bool,
    window: Option<WindowId>,
    info_window: Option<WindowId>,
    subscription: Option<Box<dyn Subscription>>,
    after_save: Option<AfterSave>,
    context: SessionContext,
}

impl Terminal {
    pub fn new(path: impl Into<PathBuf>, context: SessionContext) -> Self {
        Self {
            path: path.into(),
            container: None,
            state: TerminalState::Unbound,
            active: false,
            window: None,
            info_window: None,
            subscription: None,
            after_save: None,
            context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn container_id(&self) -> Option<&ContainerId> {
        self.container.as_ref().and_then(|c| c.id.as_ref())
    }

    pub fn address(&self) -> Option<&str> {
        self.container.as_ref().and_then(Container::address)
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn info_window(&self) -> Option<WindowId> {
        self.info_window
    }

    pub fn is_awaiting_save(&self) -> bool {
        self.after_save.is_some()
    }

    fn require_id(&self) -> Result<ContainerId, TerminalError> {
        self.container_id().cloned().ok_or(TerminalError::NoContainer)
    }

    fn require_state(
        &self,
        operation: &'static str,
        allowed: &[TerminalState],
    ) -> Result<(), TerminalError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TerminalError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn wants_dockerfile(&self) -> bool {
        !self.path.join(BOWERY_CONFIG_FILE).exists()
            && self.path.join(DOCKERFILE).exists()
            && self.context.prompter.confirm_dockerfile()
    }

    /// Creates the remote container, subscribes to its channel and shows the
    /// launching page. Nothing is left behind when this fails.
    pub fn create(&mut self) -> Result<ContainerId, TerminalError> {
        self.require_state("create", &[TerminalState::Unbound])?;
        self.state = TerminalState::Creating;
        info!(path = %self.path.display(), "Creating container");

        let use_dockerfile = self.wants_dockerfile();
        let container = match self
            .context
            .remote
            .create_container(&self.path, use_dockerfile)
        {
            Ok(container) => container,
            Err(err) => {
                self.state = TerminalState::Unbound;
                warn!(path = %self.path.display(), error = %err, "Create failed");
                return Err(if err.is_connectivity() {
                    TerminalError::Offline { source: err }
                } else {
                    err.into()
                });
            }
        };
        let Some(id) = container.id.clone() else {
            self.state = TerminalState::Unbound;
            return Err(TerminalError::NoContainer);
        };

        let subscription = match self.context.channel.subscribe(&id) {
            Ok(subscription) => subscription,
            Err(err) => {
                self.state = TerminalState::Unbound;
                warn!(container_id = %id, error = %err, "Subscribe failed; discarding container");
                if let Err(delete_err) = self.context.remote.delete_container(&id) {
                    warn!(container_id = %id, error = %delete_err, "Failed to discard container");
                }
                return Err(err.into());
            }
        };

        let window = self.context.windows.open_window(WindowKind::Session);
        self.context.windows.navigate(
            window,
            &View::Progress {
                kind: ProgressKind::Launching,
                container_id: id.clone(),
            },
        );

        debug!(container_id = %id, channel = subscription.channel(), "Subscribed for updates");
        self.container = Some(container);
        self.subscription = Some(subscription);
        self.window = Some(window);
        self.state = TerminalState::Launching;
        Ok(id)
    }

    /// Applies one pushed event. Menu gating is left to the caller, which can see
    /// every session.
    pub fn handle_event(&mut self, event: ChannelEvent) -> Result<Lifecycle, TerminalError> {
        match event {
            ChannelEvent::Created(pushed) => {
                self.on_created(pushed)?;
                Ok(Lifecycle::Alive)
            }
            ChannelEvent::Update(data) => {
                info!(container_id = ?self.container_id(), data = %data, "Container update");
                Ok(Lifecycle::Alive)
            }
            ChannelEvent::Error(data) => {
                warn!(container_id = ?self.container_id(), data = %data, "Container error event");
                Ok(Lifecycle::Alive)
            }
            ChannelEvent::Saved(_) => self.on_saved(),
        }
    }

    fn on_created(&mut self, pushed: Container) -> Result<(), TerminalError> {
        if self.state != TerminalState::Launching {
            debug!(state = %self.state, "Ignoring created event");
            return Ok(());
        }
        match self.container.as_mut() {
            Some(container) => container.finalize(pushed),
            None => self.container = Some(pushed),
        }
        self.connect()
    }

    fn on_saved(&mut self) -> Result<Lifecycle, TerminalError> {
        let Some(next) = self.after_save.take() else {
            debug!(state = %self.state, "Ignoring saved event; no save in flight");
            return Ok(Lifecycle::Alive);
        };
        info!(container_id = ?self.container_id(), "Container saved");
        match next {
            AfterSave::Reconnect => {
                self.connect()?;
                Ok(Lifecycle::Alive)
            }
            AfterSave::Export => {
                self.connect()?;
                self.export()?;
                Ok(Lifecycle::Alive)
            }
            AfterSave::Delete => match self.delete() {
                Ok(Lifecycle::Closed) => Ok(Lifecycle::Closed),
                Ok(Lifecycle::Alive) => {
                    self.connect()?;
                    Ok(Lifecycle::Alive)
                }
                Err(err) => {
                    if let Err(reconnect_err) = self.connect() {
                        warn!(error = %reconnect_err, "Failed to restore session view");
                    }
                    Err(err)
                }
            },
        }
    }

    /// Points the session window at the terminal page for this container.
    pub fn connect(&mut self) -> Result<(), TerminalError> {
        let id = self.require_id()?;
        self.require_state("connect", &CONTAINER_STATES)?;
        let connection = self
            .container
            .as_ref()
            .and_then(Container::connection_info)
            .ok_or_else(|| TerminalError::MissingCredentials(id.to_string()))?;

        let Some(window) = self.window else {
            debug!(container_id = %id, "No session window to connect");
            return Ok(());
        };
        let windows = &self.context.windows;
        windows.navigate(window, &View::Terminal(connection.clone()));
        windows.set_title(window, &connection.address);
        windows.pin_title(window);

        self.active = true;
        self.state = TerminalState::Connected;
        info!(container_id = %id, address = %connection.address, "Session connected");
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), TerminalError> {
        self.begin_save("save", ProgressKind::Saving, AfterSave::Reconnect)
    }

    pub fn save_and_delete(&mut self) -> Result<(), TerminalError> {
        self.begin_save("save and close", ProgressKind::Saving, AfterSave::Delete)
    }

    pub fn save_and_export(&mut self) -> Result<(), TerminalError> {
        self.begin_save("export", ProgressKind::Exporting, AfterSave::Export)
    }

    fn begin_save(
        &mut self,
        operation: &'static str,
        kind: ProgressKind,
        next: AfterSave,
    ) -> Result<(), TerminalError> {
        let id = self.require_id()?;
        self.require_state(operation, &[TerminalState::Connected])?;
        info!(container_id = %id, operation, "Saving container");

        match self.context.remote.save_container(&id) {
            Ok(()) => {}
            Err(RemoteError::Rejected { message }) => {
                warn!(container_id = %id, reason = %message, "Save rejected");
                self.context
                    .prompter
                    .notify(self.window, &Notice::InsufficientPermissions);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(window) = self.window {
            self.context.windows.navigate(
                window,
                &View::Progress {
                    kind,
                    container_id: id,
                },
            );
        }
        self.state = match kind {
            ProgressKind::Exporting => TerminalState::Exporting,
            _ => TerminalState::Saving,
        };
        self.after_save = Some(next);
        Ok(())
    }

    /// Deletes the container and tears the session down.
    ///
    /// A permission rejection shows a notice and keeps the session.
    pub fn delete(&mut self) -> Result<Lifecycle, TerminalError> {
        let id = self.require_id()?;
        self.require_state("delete", &CONTAINER_STATES)?;
        let prior = self.state;
        self.state = TerminalState::Deleting;
        info!(container_id = %id, "Deleting container");

        match self.context.remote.delete_container(&id) {
            Ok(()) => {
                self.teardown();
                Ok(Lifecycle::Closed)
            }
            Err(RemoteError::Rejected { message }) => {
                self.state = prior;
                warn!(container_id = %id, reason = %message, "Delete rejected");
                self.context
                    .prompter
                    .notify(self.window, &Notice::InsufficientPermissions);
                Ok(Lifecycle::Alive)
            }
            Err(err) => {
                self.state = prior;
                Err(err.into())
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(window) = self.info_window.take() {
            self.context.windows.destroy(window);
        }
        if let Some(window) = self.window.take() {
            self.context.windows.destroy(window);
        }
        self.active = false;
        self.after_save = None;
        self.state = TerminalState::Closed;
    }

    /// Offers the Docker or Shell export of this environment on the clipboard.
    pub fn export(&self) -> Result<(), TerminalError> {
        let address = self.address().ok_or(TerminalError::NoContainer)?;
        let export = self.context.remote.export_env(address)?;
        if !export.is_success() {
            warn!(address, status = %export.status, "Export not available");
            return Ok(());
        }

        let Some(format) = self.context.prompter.choose_export_format(self.window) else {
            debug!(address, "Export canceled");
            return Ok(());
        };
        let payload = export.payload(format).ok_or_else(|| {
            RemoteError::Malformed(format!("export reply has no {format:?} payload"))
        })?;
        self.context.clipboard.write_text(payload);
        self.context
            .prompter
            .notify(self.window, &Notice::Copied(format));
        info!(address, ?format, "Export copied to clipboard");
        Ok(())
    }

    /// Opens the info window and disables the Info command until it closes.
    pub fn info(&mut self, menu: &mut Menu) -> Result<(), TerminalError> {
        let id = self.require_id()?;
        let container = self.container.as_ref().ok_or(TerminalError::NoContainer)?;
        let connection = container
            .connection_info()
            .ok_or_else(|| TerminalError::MissingCredentials(id.to_string()))?;
        if self.info_window.is_some() {
            debug!(container_id = %id, "Info window already open");
            return Ok(());
        }

        let window = self.context.windows.open_window(WindowKind::Info);
        self.context.windows.navigate(
            window,
            &View::Info {
                project_id: container.image_id.clone().unwrap_or_default(),
                connection,
            },
        );
        self.info_window = Some(window);
        menu.update_submenu_item(
            FILE_MENU,
            MenuCommand::Info.label(),
            MenuProperty::Enabled(false),
        );
        Ok(())
    }

    pub fn info_closed(&mut self, menu: &mut Menu) {
        if self.info_window.take().is_some() {
            menu.update_submenu_item(
                FILE_MENU,
                MenuCommand::Info.label(),
                MenuProperty::Enabled(true),
            );
        }
    }

    /// Close request on the session window.
    ///
    /// An inactive session is deleted without asking. Otherwise the user picks
    /// Save, Don't save or Cancel; Cancel can be repeated any number of times.
    pub fn handle_window_close(&mut self) -> Result<Lifecycle, TerminalError> {
        let window = match self.window {
            Some(window) if self.active => window,
            _ => return self.delete(),
        };
        match self.context.prompter.confirm_close(window) {
            CloseChoice::Save => {
                self.save_and_delete()?;
                Ok(Lifecycle::Alive)
            }
            CloseChoice::DontSave => self.delete(),
            CloseChoice::Cancel => {
                debug!(%window, "Close canceled");
                self.context.windows.notify_canceled(window);
                Ok(Lifecycle::Alive)
            }
        }
    }

    pub fn open_in_browser(&self) -> Result<(), TerminalError> {
        let address = self.address().ok_or(TerminalError::NoContainer)?;
        self.context
            .windows
            .open_external(&format!("http://{address}"));
        Ok(())
    }

    /// Opens the synced project directory. The container's recorded local path
    /// wins over the path the session was created with.
    pub fn open_in_file_manager(&self) -> Result<(), TerminalError> {
        let container = self.container.as_ref().ok_or(TerminalError::NoContainer)?;
        let dir = container
            .local_path
            .as_deref()
            .map_or_else(|| self.path.clone(), PathBuf::from);
        let url = std::path::absolute(&dir)
            .ok()
            .and_then(|absolute| Url::from_directory_path(absolute).ok())
            .ok_or_else(|| TerminalError::LocalPath(dir.clone()))?;
        debug!(path = %dir.display(), "Opening project directory");
        self.context.windows.open_external(url.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvExport;
    use crate::domain::SESSION_COMMANDS;
    use crate::domain::ExportFormat;
    use crate::test_support::MockClipboard;
    use crate::test_support::MockEventChannel;
    use crate::test_support::MockPrompter;
    use crate::test_support::MockRemoteApi;
    use crate::test_support::MockWindowHost;
    use crate::test_support::RemoteCall;
    use crate::test_support::WindowCall;
    use crate::usecases::ports::ChannelError;

    struct Harness {
        remote: Arc<MockRemoteApi>,
        channel: Arc<MockEventChannel>,
        windows: Arc<MockWindowHost>,
        prompter: Arc<MockPrompter>,
        clipboard: Arc<MockClipboard>,
        menu: Menu,
    }

    impl Harness {
        fn new(remote: MockRemoteApi) -> Self {
            Self::with_prompter(remote, MockPrompter::new())
        }

        fn with_prompter(remote: MockRemoteApi, prompter: MockPrompter) -> Self {
            Self {
                remote: Arc::new(remote),
                channel: Arc::new(MockEventChannel::new()),
                windows: Arc::new(MockWindowHost::new()),
                prompter: Arc::new(prompter),
                clipboard: Arc::new(MockClipboard::new()),
                menu: Menu::with_session_commands(),
            }
        }

        fn context(&self) -> SessionContext {
            SessionContext {
                remote: self.remote.clone(),
                channel: self.channel.clone(),
                windows: self.windows.clone(),
                prompter: self.prompter.clone(),
                clipboard: self.clipboard.clone(),
            }
        }

        fn terminal(&self, path: &str) -> Terminal {
            Terminal::new(path, self.context())
        }

        fn connected(&mut self) -> Terminal {
            let mut terminal = self.terminal("/home/user/app");
            terminal.create().unwrap();
            terminal.handle_event(created_event()).unwrap();
            terminal
        }
    }

    fn launched_container() -> Container {
        Container {
            id: Some(ContainerId::try_new("c1").unwrap()),
            address: Some("10.0.0.5".into()),
            user: Some("root".into()),
            password: Some("x".into()),
            image_id: Some("img-9".into()),
            ..Container::default()
        }
    }

    fn created_event() -> ChannelEvent {
        ChannelEvent::Created(launched_container())
    }

    fn saved_event() -> ChannelEvent {
        ChannelEvent::Saved(serde_json::Value::Null)
    }

    fn rejected() -> RemoteError {
        RemoteError::Rejected {
            message: "not allowed".into(),
        }
    }

    fn offline() -> RemoteError {
        RemoteError::Transport {
            url: "http://localhost:32055".into(),
            reason: "connection refused".into(),
        }
    }

    #[test]
    fn test_save_and_delete_without_container_fail_before_network() {
        let harness = Harness::new(MockRemoteApi::new());
        let mut terminal = harness.terminal("/home/user/app");

        assert!(matches!(terminal.save(), Err(TerminalError::NoContainer)));
        assert!(matches!(terminal.delete(), Err(TerminalError::NoContainer)));
        assert!(matches!(terminal.connect(), Err(TerminalError::NoContainer)));
        assert!(matches!(
            terminal.save_and_delete(),
            Err(TerminalError::NoContainer)
        ));
        assert_eq!(harness.remote.call_count(), 0);
    }

    #[test]
    fn test_create_then_created_event_connects_session() {
        let harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.terminal("/home/user/app");

        let id = terminal.create().unwrap();
        assert_eq!(id.as_str(), "c1");
        assert_eq!(terminal.state(), TerminalState::Launching);
        assert!(!terminal.is_active());
        let window = terminal.window().unwrap();
        assert_eq!(
            harness.windows.location(window).as_deref(),
            Some("progress.html?type=launching&container_id=c1")
        );
        assert_eq!(harness.channel.channels(), vec!["container-c1".to_string()]);

        let outcome = terminal.handle_event(created_event()).unwrap();

        assert_eq!(outcome, Lifecycle::Alive);
        assert!(terminal.is_active());
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert_eq!(
            harness.windows.location(window).as_deref(),
            Some("term.html?ip=10.0.0.5&user=root&password=x")
        );
        assert_eq!(harness.windows.title(window).as_deref(), Some("10.0.0.5"));
        assert!(harness.windows.calls().contains(&WindowCall::PinTitle(window)));
        for command in SESSION_COMMANDS {
            assert!(!harness.menu.is_enabled(command), "{command} gated by the session");
        }
        assert_eq!(
            harness.remote.calls(),
            vec![RemoteCall::Create {
                local_path: PathBuf::from("/home/user/app"),
                use_dockerfile: false,
            }]
        );
    }

    #[test]
    fn test_created_event_outside_launching_is_ignored() {
        let harness = Harness::new(MockRemoteApi::new());
        let mut terminal = harness.terminal("/home/user/app");

        terminal.handle_event(created_event()).unwrap();

        assert_eq!(terminal.state(), TerminalState::Unbound);
        assert!(!terminal.is_active());
        assert!(terminal.window().is_none());
    }

    #[test]
    fn test_created_event_without_credentials_keeps_launching() {
        let harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.terminal("/home/user/app");
        terminal.create().unwrap();

        let result = terminal.handle_event(ChannelEvent::Created(Container {
            address: Some("10.0.0.5".into()),
            ..Container::default()
        }));

        assert!(matches!(result, Err(TerminalError::MissingCredentials(_))));
        assert_eq!(terminal.state(), TerminalState::Launching);
        assert!(!terminal.is_active());
    }

    #[test]
    fn test_create_offline_maps_to_internet_message() {
        let harness = Harness::new(MockRemoteApi::builder().with_create_error(offline()).build());
        let mut terminal = harness.terminal("/home/user/app");

        let err = terminal.create().unwrap_err();

        assert!(matches!(err, TerminalError::Offline { .. }));
        assert_eq!(terminal.state(), TerminalState::Unbound);
        assert!(harness.windows.opened().is_empty());
        assert!(harness.channel.channels().is_empty());
    }

    #[test]
    fn test_create_rejected_propagates_message() {
        let harness = Harness::new(MockRemoteApi::builder().with_create_error(rejected()).build());
        let mut terminal = harness.terminal("/home/user/app");

        let err = terminal.create().unwrap_err();

        assert_eq!(err.to_string(), "not allowed");
        assert!(terminal.window().is_none());
    }

    #[test]
    fn test_create_twice_is_invalid() {
        let harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.terminal("/home/user/app");
        terminal.create().unwrap();

        assert!(matches!(
            terminal.create(),
            Err(TerminalError::InvalidState { .. })
        ));
        assert_eq!(harness.remote.call_count(), 1);
    }

    #[test]
    fn test_subscribe_failure_discards_container() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        harness.channel = Arc::new(MockEventChannel::failing(ChannelError::Closed));
        let mut terminal = harness.terminal("/home/user/app");

        let err = terminal.create().unwrap_err();

        assert!(matches!(err, TerminalError::Channel(ChannelError::Closed)));
        assert!(harness.windows.opened().is_empty());
        assert_eq!(harness.remote.delete_count(), 1);
        assert_eq!(terminal.state(), TerminalState::Unbound);
    }

    #[test]
    fn test_dockerfile_prompt_only_without_bowery_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DOCKERFILE), "FROM ubuntu\n").unwrap();
        let harness = Harness::with_prompter(
            MockRemoteApi::builder().with_created_id("c1").build(),
            MockPrompter::new().with_dockerfile(true),
        );

        let mut terminal = Terminal::new(dir.path(), harness.context());
        terminal.create().unwrap();

        assert_eq!(harness.prompter.dockerfile_prompt_count(), 1);
        assert!(matches!(
            harness.remote.calls()[0],
            RemoteCall::Create {
                use_dockerfile: true,
                ..
            }
        ));

        std::fs::write(dir.path().join(BOWERY_CONFIG_FILE), "{}").unwrap();
        let mut second = Terminal::new(dir.path(), harness.context());
        second.create().unwrap();

        assert_eq!(harness.prompter.dockerfile_prompt_count(), 1);
        assert!(matches!(
            harness.remote.calls()[1],
            RemoteCall::Create {
                use_dockerfile: false,
                ..
            }
        ));
    }

    #[test]
    fn test_save_rejected_shows_notice_and_keeps_state() {
        let mut harness = Harness::new(
            MockRemoteApi::builder()
                .with_created_id("c1")
                .with_save_error(rejected())
                .build(),
        );
        let mut terminal = harness.connected();
        let window = terminal.window().unwrap();

        terminal.save().unwrap();

        assert_eq!(harness.prompter.notices(), vec![Notice::InsufficientPermissions]);
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert!(!terminal.is_awaiting_save());
        assert_eq!(
            harness.windows.location(window).as_deref(),
            Some("term.html?ip=10.0.0.5&user=root&password=x")
        );
    }

    #[test]
    fn test_save_shows_progress_then_reconnects_on_saved() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.connected();
        let window = terminal.window().unwrap();

        terminal.save().unwrap();
        assert_eq!(terminal.state(), TerminalState::Saving);
        assert_eq!(
            harness.windows.location(window).as_deref(),
            Some("progress.html?type=saving&container_id=c1")
        );

        let outcome = terminal.handle_event(saved_event()).unwrap();

        assert_eq!(outcome, Lifecycle::Alive);
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert_eq!(
            harness.windows.location(window).as_deref(),
            Some("term.html?ip=10.0.0.5&user=root&password=x")
        );
    }

    #[test]
    fn test_save_transport_error_propagates() {
        let mut harness = Harness::new(
            MockRemoteApi::builder()
                .with_created_id("c1")
                .with_save_error(offline())
                .build(),
        );
        let mut terminal = harness.connected();

        let err = terminal.save().unwrap_err();

        assert!(matches!(err, TerminalError::Remote(RemoteError::Transport { .. })));
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert!(harness.prompter.notices().is_empty());
    }

    #[test]
    fn test_close_inactive_deletes_without_prompt() {
        let harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.terminal("/home/user/app");
        terminal.create().unwrap();
        let window = terminal.window().unwrap();

        let outcome = terminal.handle_window_close().unwrap();

        assert_eq!(outcome, Lifecycle::Closed);
        assert_eq!(harness.remote.delete_count(), 1);
        assert_eq!(harness.prompter.close_prompt_count(), 0);
        assert_eq!(harness.windows.destroyed(), vec![window]);
        assert!(harness.channel.is_unsubscribed("container-c1"));
        assert_eq!(terminal.state(), TerminalState::Closed);
    }

    #[test]
    fn test_close_cancel_keeps_window_and_can_repeat() {
        let mut harness = Harness::with_prompter(
            MockRemoteApi::builder().with_created_id("c1").build(),
            MockPrompter::new().with_close_choice(CloseChoice::Cancel),
        );
        let mut terminal = harness.connected();
        let window = terminal.window().unwrap();

        assert_eq!(terminal.handle_window_close().unwrap(), Lifecycle::Alive);
        assert_eq!(terminal.handle_window_close().unwrap(), Lifecycle::Alive);

        assert_eq!(harness.prompter.close_prompt_count(), 2);
        assert!(harness.windows.destroyed().is_empty());
        assert_eq!(
            harness
                .windows
                .calls()
                .iter()
                .filter(|call| **call == WindowCall::Canceled(window))
                .count(),
            2
        );
        assert_eq!(harness.remote.delete_count(), 0);
        assert_eq!(terminal.state(), TerminalState::Connected);
    }

    #[test]
    fn test_close_dont_save_deletes() {
        let mut harness = Harness::with_prompter(
            MockRemoteApi::builder().with_created_id("c1").build(),
            MockPrompter::new().with_close_choice(CloseChoice::DontSave),
        );
        let mut terminal = harness.connected();

        assert_eq!(terminal.handle_window_close().unwrap(), Lifecycle::Closed);
        assert_eq!(harness.remote.delete_count(), 1);
        assert!(!harness.remote.calls().iter().any(|c| matches!(c, RemoteCall::Save(_))));
    }

    #[test]
    fn test_close_save_waits_for_saved_then_deletes() {
        let mut harness = Harness::with_prompter(
            MockRemoteApi::builder().with_created_id("c1").build(),
            MockPrompter::new().with_close_choice(CloseChoice::Save),
        );
        let mut terminal = harness.connected();

        assert_eq!(terminal.handle_window_close().unwrap(), Lifecycle::Alive);
        assert_eq!(terminal.state(), TerminalState::Saving);
        assert_eq!(harness.remote.delete_count(), 0);

        let outcome = terminal.handle_event(saved_event()).unwrap();

        assert_eq!(outcome, Lifecycle::Closed);
        assert_eq!(harness.remote.delete_count(), 1);
        assert!(harness.channel.is_unsubscribed("container-c1"));
    }

    #[test]
    fn test_delete_after_save_failure_restores_session() {
        let mut harness = Harness::with_prompter(
            MockRemoteApi::builder().with_created_id("c1").build(),
            MockPrompter::new().with_close_choice(CloseChoice::Save),
        );
        let mut terminal = harness.connected();
        terminal.handle_window_close().unwrap();
        harness.remote.set_delete_error(Some(offline()));

        let result = terminal.handle_event(saved_event());

        assert!(result.is_err());
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert!(harness.windows.destroyed().is_empty());
    }

    #[test]
    fn test_delete_rejected_keeps_session() {
        let mut harness = Harness::new(
            MockRemoteApi::builder()
                .with_created_id("c1")
                .with_delete_error(rejected())
                .build(),
        );
        let mut terminal = harness.connected();

        assert_eq!(terminal.delete().unwrap(), Lifecycle::Alive);
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert_eq!(harness.prompter.notices(), vec![Notice::InsufficientPermissions]);
    }

    #[test]
    fn test_delete_transport_error_restores_prior_state() {
        let mut harness = Harness::new(
            MockRemoteApi::builder()
                .with_created_id("c1")
                .with_delete_error(offline())
                .build(),
        );
        let mut terminal = harness.connected();

        assert!(terminal.delete().is_err());
        assert_eq!(terminal.state(), TerminalState::Connected);
        assert!(terminal.window().is_some());
    }

    #[test]
    fn test_save_and_export_copies_payload_after_saved() {
        let mut harness = Harness::with_prompter(
            MockRemoteApi::builder()
                .with_created_id("c1")
                .with_export(EnvExport {
                    status: "success".into(),
                    docker: Some("curl env | docker load".into()),
                    shell: Some("#!/bin/sh".into()),
                })
                .build(),
            MockPrompter::new().with_export_format(Some(ExportFormat::Docker)),
        );
        let mut terminal = harness.connected();
        let window = terminal.window().unwrap();

        terminal.save_and_export().unwrap();
        assert_eq!(terminal.state(), TerminalState::Exporting);
        assert_eq!(
            harness.windows.location(window).as_deref(),
            Some("progress.html?type=exporting&container_id=c1")
        );
        assert!(harness.clipboard.contents().is_none());

        terminal.handle_event(saved_event()).unwrap();

        assert_eq!(terminal.state(), TerminalState::Connected);
        assert_eq!(
            harness.clipboard.contents().as_deref(),
            Some("curl env | docker load")
        );
        assert_eq!(
            harness.prompter.notices(),
            vec![Notice::Copied(ExportFormat::Docker)]
        );
        assert!(
            harness
                .remote
                .calls()
                .contains(&RemoteCall::Export("10.0.0.5".into()))
        );
    }

    #[test]
    fn test_export_cancel_or_failure_copies_nothing() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let terminal = harness.connected();

        terminal.export().unwrap();

        assert!(harness.clipboard.contents().is_none());
        assert!(harness.prompter.notices().is_empty());
    }

    #[test]
    fn test_info_window_toggles_menu_item() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.connected();

        terminal.info(&mut harness.menu).unwrap();
        let info = terminal.info_window().unwrap();

        assert!(!harness.menu.is_enabled(MenuCommand::Info));
        assert_eq!(
            harness.windows.location(info).as_deref(),
            Some("info.html?project_id=img-9&address=10.0.0.5&ssh_port=23&username=root&password=x")
        );

        terminal.info_closed(&mut harness.menu);

        assert!(harness.menu.is_enabled(MenuCommand::Info));
        assert!(terminal.info_window().is_none());
    }

    #[test]
    fn test_delete_destroys_info_window() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.connected();
        terminal.info(&mut harness.menu).unwrap();
        let info = terminal.info_window().unwrap();
        let window = terminal.window().unwrap();

        terminal.delete().unwrap();

        assert_eq!(harness.windows.destroyed(), vec![info, window]);
    }

    #[test]
    fn test_open_in_browser_uses_address() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let terminal = harness.connected();

        terminal.open_in_browser().unwrap();

        assert!(
            harness
                .windows
                .calls()
                .contains(&WindowCall::OpenExternal("http://10.0.0.5".into()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_open_in_file_manager_prefers_container_local_path() {
        let harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.terminal("/home/user/app");
        terminal.create().unwrap();
        terminal
            .handle_event(ChannelEvent::Created(Container {
                local_path: Some("/home/user/my app".into()),
                ..launched_container()
            }))
            .unwrap();

        terminal.open_in_file_manager().unwrap();

        assert!(
            harness
                .windows
                .calls()
                .contains(&WindowCall::OpenExternal("file:///home/user/my%20app/".into()))
        );
    }

    #[test]
    fn test_open_in_file_manager_needs_container() {
        let harness = Harness::new(MockRemoteApi::new());
        let terminal = harness.terminal("/home/user/app");

        assert!(matches!(
            terminal.open_in_file_manager(),
            Err(TerminalError::NoContainer)
        ));
        assert!(harness.windows.calls().is_empty());
    }

    #[test]
    fn test_update_and_error_events_do_not_change_state() {
        let mut harness = Harness::new(MockRemoteApi::builder().with_created_id("c1").build());
        let mut terminal = harness.connected();

        let update = ChannelEvent::Update(serde_json::json!({ "progress": 50 }));
        let error = ChannelEvent::Error(serde_json::json!({ "message": "disk full" }));
        assert_eq!(
            terminal.handle_event(update).unwrap(),
            Lifecycle::Alive
        );
        assert_eq!(
            terminal.handle_event(error).unwrap(),
            Lifecycle::Alive
        );
        assert_eq!(terminal.state(), TerminalState::Connected);
    }
}
