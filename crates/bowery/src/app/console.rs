//! Console stand-ins for the native window, dialog and clipboard surfaces.
//!
//! Windows are records printed as they change. Dialogs read their answer from the
//! same stdin line queue the event loop reads commands from; the loop is blocked
//! while a dialog waits, so the two never race for a line.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crossbeam_channel::Receiver;
use tracing::debug;
use tracing::warn;

use crate::common::Colors;
use crate::common::mutex_lock_or_recover;
use crate::domain::ExportFormat;
use crate::domain::View;
use crate::usecases::ports::prompter::CLOSE_DETAIL;
use crate::usecases::ports::prompter::CLOSE_QUESTION;
use crate::usecases::ports::Clipboard;
use crate::usecases::ports::CloseChoice;
use crate::usecases::ports::prompter::DOCKERFILE_DETAIL;
use crate::usecases::ports::prompter::DOCKERFILE_QUESTION;
use crate::usecases::ports::prompter::EXPORT_DETAIL;
use crate::usecases::ports::prompter::EXPORT_QUESTION;
use crate::usecases::ports::Notice;
use crate::usecases::ports::Prompter;
use crate::usecases::ports::WindowHost;
use crate::usecases::ports::WindowId;
use crate::usecases::ports::WindowKind;

pub const BROWSER_ENV: &str = "BOWERY_BROWSER";

/// Line-oriented output shared by every console adapter.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    pub fn line(&self, text: impl Display) {
        let mut out = mutex_lock_or_recover(&self.out);
        if let Err(err) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            debug!(error = %err, "Console write failed");
        }
    }
}

/// In-memory console output for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub fn console(&self) -> Console {
        Console::new(Box::new(self.clone()))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&mutex_lock_or_recover(&self.0)).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        mutex_lock_or_recover(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub id: WindowId,
    pub kind: WindowKind,
    pub title: String,
    pub location: Option<String>,
    pub title_pinned: bool,
}

pub struct ConsoleWindowHost {
    console: Console,
    next_id: AtomicU64,
    windows: Mutex<BTreeMap<WindowId, WindowRecord>>,
    browser: Option<String>,
}

impl ConsoleWindowHost {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            next_id: AtomicU64::new(1),
            windows: Mutex::new(BTreeMap::new()),
            browser: std::env::var(BROWSER_ENV).ok(),
        }
    }

    pub fn with_browser(mut self, browser: Option<String>) -> Self {
        self.browser = browser;
        self
    }

    pub fn windows(&self) -> Vec<WindowRecord> {
        mutex_lock_or_recover(&self.windows).values().cloned().collect()
    }

    pub fn windows_of(&self, kind: WindowKind) -> Vec<WindowId> {
        mutex_lock_or_recover(&self.windows)
            .values()
            .filter(|record| record.kind == kind)
            .map(|record| record.id)
            .collect()
    }

    fn title_of(&self, window: WindowId) -> String {
        mutex_lock_or_recover(&self.windows)
            .get(&window)
            .map(|record| record.title.clone())
            .unwrap_or_else(|| window.to_string())
    }

    fn render(&self, window: WindowId, view: &View) {
        let title = Colors::dim(&format!("[{}]", self.title_of(window)));
        match view {
            View::Progress { kind, container_id } => self.console.line(format!(
                "{title} {} {}...",
                capitalize(kind.as_str()),
                container_id
            )),
            View::Terminal(info) => self.console.line(format!(
                "{title} {} {} (user {}, password {})",
                Colors::success("Connected to"),
                Colors::address(&info.address),
                info.user,
                info.password
            )),
            View::Info {
                project_id,
                connection,
            } => {
                self.console.line(format!("{title} {}", Colors::bold("Environment info")));
                self.console.line(format!("  Project:  {project_id}"));
                self.console.line(format!("  Address:  {}", Colors::address(&connection.address)));
                self.console.line(format!("  SSH port: {}", crate::domain::view::INFO_SSH_PORT));
                self.console.line(format!("  Username: {}", connection.user));
                self.console.line(format!("  Password: {}", connection.password));
                self.console.line(Colors::dim("  (type 'dismiss' to close this window)"));
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl WindowHost for ConsoleWindowHost {
    fn open_window(&self, kind: WindowKind) -> WindowId {
        let id = WindowId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        mutex_lock_or_recover(&self.windows).insert(
            id,
            WindowRecord {
                id,
                kind,
                title: kind.default_title().to_string(),
                location: None,
                title_pinned: false,
            },
        );
        debug!(%id, ?kind, "Window opened");
        id
    }

    fn navigate(&self, window: WindowId, view: &View) {
        let known = match mutex_lock_or_recover(&self.windows).get_mut(&window) {
            Some(record) => {
                record.location = Some(view.location());
                true
            }
            None => false,
        };
        if known {
            self.render(window, view);
        } else {
            warn!(%window, "Navigate on unknown window");
        }
    }

    fn set_title(&self, window: WindowId, title: &str) {
        if let Some(record) = mutex_lock_or_recover(&self.windows)
            .get_mut(&window)
            .filter(|record| !record.title_pinned)
        {
            record.title = title.to_string();
        }
    }

    fn pin_title(&self, window: WindowId) {
        if let Some(record) = mutex_lock_or_recover(&self.windows).get_mut(&window) {
            record.title_pinned = true;
        }
    }

    fn notify_canceled(&self, window: WindowId) {
        self.console.line(format!(
            "{} Close canceled; {} stays open.",
            Colors::dim("note:"),
            self.title_of(window)
        ));
    }

    fn destroy(&self, window: WindowId) {
        if let Some(record) = mutex_lock_or_recover(&self.windows).remove(&window) {
            debug!(%window, title = %record.title, "Window destroyed");
        }
    }

    fn open_external(&self, url: &str) {
        self.console.line(format!("Opening {}", Colors::address(url)));
        if let Err(err) = open_in_browser(url, self.browser.as_deref()) {
            warn!(url, error = %err, "Failed to open browser");
            self.console.line(format!("{} {err}", Colors::warning("warning:")));
        }
    }
}

fn open_in_browser(url: &str, browser: Option<&str>) -> Result<(), String> {
    let mut cmd = if let Some(browser) = browser {
        let parts = shell_words::split(browser).map_err(|e| e.to_string())?;
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| format!("{BROWSER_ENV} is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start"]);
        cmd
    } else {
        Command::new("xdg-open")
    };

    let status = cmd.arg(url).status().map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("Browser command exited with status {status}"))
    }
}

pub struct ConsolePrompter {
    console: Console,
    answers: Receiver<String>,
}

impl ConsolePrompter {
    pub fn new(console: Console, answers: Receiver<String>) -> Self {
        Self { console, answers }
    }

    /// Asks until `parse` accepts an answer. `None` once input is closed.
    fn ask<T>(
        &self,
        question: &str,
        detail: &str,
        choices: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        self.console.line(Colors::bold(question));
        self.console.line(Colors::dim(detail));
        loop {
            self.console.line(format!("{choices} "));
            let Ok(answer) = self.answers.recv() else {
                debug!(question, "Input closed while prompting");
                return None;
            };
            match parse(answer.trim()) {
                Some(value) => return Some(value),
                None => self
                    .console
                    .line(format!("{} {choices}", Colors::warning("Please answer"))),
            }
        }
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn parse_close_choice(answer: &str) -> Option<CloseChoice> {
    match answer.to_ascii_lowercase().as_str() {
        "s" | "save" => Some(CloseChoice::Save),
        "d" | "dont" | "don't" | "dont save" | "don't save" => Some(CloseChoice::DontSave),
        "c" | "cancel" => Some(CloseChoice::Cancel),
        _ => None,
    }
}

/// `Some(None)` is an explicit cancel.
fn parse_export_format(answer: &str) -> Option<Option<ExportFormat>> {
    match answer.to_ascii_lowercase().as_str() {
        "docker" => Some(Some(ExportFormat::Docker)),
        "shell" => Some(Some(ExportFormat::Shell)),
        "c" | "cancel" => Some(None),
        _ => None,
    }
}

impl Prompter for ConsolePrompter {
    fn confirm_dockerfile(&self) -> bool {
        self.ask(DOCKERFILE_QUESTION, DOCKERFILE_DETAIL, "[yes/no]", parse_yes_no)
            .unwrap_or(false)
    }

    fn confirm_close(&self, _window: WindowId) -> CloseChoice {
        self.ask(
            CLOSE_QUESTION,
            CLOSE_DETAIL,
            "[save/don't save/cancel]",
            parse_close_choice,
        )
        .unwrap_or(CloseChoice::Cancel)
    }

    fn choose_export_format(&self, _window: Option<WindowId>) -> Option<ExportFormat> {
        self.ask(
            EXPORT_QUESTION,
            EXPORT_DETAIL,
            "[docker/shell/cancel]",
            parse_export_format,
        )
        .flatten()
    }

    fn notify(&self, _window: Option<WindowId>, notice: &Notice) {
        let label = match notice {
            Notice::InsufficientPermissions => Colors::error(notice.message()),
            Notice::Copied(_) => Colors::success(notice.message()),
        };
        self.console.line(format!("{label} {}", notice.detail()));
    }
}

pub struct ConsoleClipboard {
    console: Console,
    contents: Mutex<Option<String>>,
}

impl ConsoleClipboard {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            contents: Mutex::new(None),
        }
    }

    pub fn contents(&self) -> Option<String> {
        mutex_lock_or_recover(&self.contents).clone()
    }
}

impl Clipboard for ConsoleClipboard {
    fn write_text(&self, text: &str) {
        *mutex_lock_or_recover(&self.contents) = Some(text.to_string());
        self.console.line(text);
    }
}
