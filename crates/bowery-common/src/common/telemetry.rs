#![expect(clippy::print_stderr, reason = "Tracing not initialized yet")]

//! Tracing setup for the client.
//!
//! Without `RUST_LOG` the client logs warnings only. `--verbose` raises the
//! Bowery crates to `debug` while the WebSocket and HTTP libraries stay at `warn`,
//! since their per-frame chatter drowns out sync events.

use std::fs;
use std::fs::File;
use std::io;
use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const LOG_FILE_ENV: &str = "BOWERY_LOG";
pub const LOG_FORMAT_ENV: &str = "BOWERY_LOG_FORMAT";
pub const LOG_STREAM_ENV: &str = "BOWERY_LOG_STREAM";

const CLIENT_TARGETS: [&str; 5] = [
    "bowery",
    "bowery_common",
    "bowery_domain",
    "bowery_usecases",
    "bowery_infra",
];
const NOISY_TARGETS: [&str; 2] = ["tungstenite", "ureq"];

/// Keeps the non-blocking file writer flushing; hold it until exit.
#[derive(Debug)]
pub struct TelemetryGuard {
    _worker: Option<WorkerGuard>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogDestination {
    File(PathBuf),
    Stdout,
    Stderr,
}

/// Where and how client logs are written, resolved from `BOWERY_LOG*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    pub destination: LogDestination,
    pub verbose: bool,
}

impl LogSettings {
    pub fn from_env(verbose: bool) -> Self {
        Self::resolve(verbose, |key| std::env::var(key).ok())
    }

    fn resolve(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let setting = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let format = match setting(LOG_FORMAT_ENV)
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        // A log file wins over the stream choice.
        let destination = match setting(LOG_FILE_ENV) {
            Some(path) => LogDestination::File(PathBuf::from(path)),
            None => match setting(LOG_STREAM_ENV)
                .map(|value| value.to_ascii_lowercase())
                .as_deref()
            {
                Some("stdout") => LogDestination::Stdout,
                _ => LogDestination::Stderr,
            },
        };

        Self {
            format,
            destination,
            verbose,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        if !self.verbose {
            return "warn".to_string();
        }
        let mut directives = vec!["info".to_string()];
        directives.extend(CLIENT_TARGETS.iter().map(|target| format!("{target}=debug")));
        directives.extend(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")));
        directives.join(",")
    }
}

/// Opens `path` for appending, creating missing parent directories. Shared by the
/// client log and the daemon's redirected output.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}

pub fn init_tracing(verbose: bool) -> TelemetryGuard {
    let settings = LogSettings::from_env(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_directives()));
    let (writer, worker, ansi) = open_writer(&settings.destination);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(settings.verbose)
        .with_thread_names(true);
    let installed = match settings.format {
        LogFormat::Json => builder
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .try_init(),
        LogFormat::Text => builder.with_ansi(ansi).with_writer(writer).try_init(),
    };

    TelemetryGuard {
        _worker: installed.ok().and(worker),
    }
}

fn open_writer(destination: &LogDestination) -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
    match destination {
        LogDestination::File(path) => match open_log_file(path) {
            Ok(file) => {
                let (non_blocking, worker) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(worker), false)
            }
            Err(err) => {
                eprintln!(
                    "Warning: cannot write log file {}, logging to stderr: {err}",
                    path.display()
                );
                stderr_writer()
            }
        },
        LogDestination::Stdout => (
            BoxMakeWriter::new(io::stdout),
            None,
            io::stdout().is_terminal(),
        ),
        LogDestination::Stderr => stderr_writer(),
    }
}

fn stderr_writer() -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
    (
        BoxMakeWriter::new(io::stderr),
        None,
        io::stderr().is_terminal(),
    )
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, reason = "Test-only assertions")]

    use std::collections::HashMap;

    use super::*;

    fn settings(verbose: bool, vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        LogSettings::resolve(verbose, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_text_on_stderr() {
        let resolved = settings(false, &[]);
        assert_eq!(resolved.format, LogFormat::Text);
        assert_eq!(resolved.destination, LogDestination::Stderr);
    }

    #[test]
    fn test_log_file_overrides_stream() {
        let resolved = settings(
            false,
            &[
                (LOG_FILE_ENV, " /var/log/bowery.log "),
                (LOG_STREAM_ENV, "stdout"),
                (LOG_FORMAT_ENV, "JSON"),
            ],
        );
        assert_eq!(
            resolved.destination,
            LogDestination::File(PathBuf::from("/var/log/bowery.log"))
        );
        assert_eq!(resolved.format, LogFormat::Json);
    }

    #[test]
    fn test_blank_log_file_falls_back_to_stream() {
        let resolved = settings(false, &[(LOG_FILE_ENV, "  "), (LOG_STREAM_ENV, "Stdout")]);
        assert_eq!(resolved.destination, LogDestination::Stdout);
    }

    #[test]
    fn test_quiet_filter_without_verbose() {
        assert_eq!(settings(false, &[]).default_directives(), "warn");
    }

    #[test]
    fn test_verbose_filter_keeps_transport_crates_quiet() {
        let directives = settings(true, &[]).default_directives();
        assert!(directives.contains("bowery_infra=debug"));
        assert!(directives.contains("tungstenite=warn"));
        assert!(directives.contains("ureq=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_open_log_file_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("client.log");

        io::Write::write_all(&mut open_log_file(&path).unwrap(), b"first\n").unwrap();
        io::Write::write_all(&mut open_log_file(&path).unwrap(), b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
