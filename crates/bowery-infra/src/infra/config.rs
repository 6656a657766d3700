//! Client configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::common::parse_env_bool;
use crate::common::parse_env_u16;
use crate::common::parse_env_u32;
use crate::common::parse_env_u64;
use crate::usecases::HealthPolicy;

pub const DEFAULT_PORT: u16 = 32055;
pub const DEFAULT_PUSHER_KEY: &str = "bbdd9d611b463822cf6e";
pub const DEFAULT_PUSHER_HOST: &str = "ws.pusherapp.com";
pub const DEFAULT_VERSION_URL: &str = "http://desktop.bowery.io.s3.amazonaws.com/VERSION";
const DEFAULT_HEALTH_ATTEMPTS: u32 = 15;
const DEFAULT_HEALTH_INTERVAL_MS: u64 = 1500;
const CLIENT_BINARY: &str = "client";
const UPDATER_BINARY: &str = "updater";

/// Platform file name of a bundled binary.
pub fn exe_name(stem: &str) -> String {
    format!("{stem}{}", env::consts::EXE_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    port: u16,
    bin_dir: PathBuf,
    install_dir: PathBuf,
    use_updater: bool,
    version_url: String,
    daemon_log: Option<PathBuf>,
    health_attempts: u32,
    health_interval: Duration,
    pusher_key: String,
    pusher_url: Option<String>,
    temp_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `bin/` next to the running executable's directory, like a packaged install.
fn default_bin_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("..").join("bin")))
        .unwrap_or_else(|| PathBuf::from("bin"))
}

fn default_install_dir(bin_dir: &std::path::Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        bin_dir.join("..").join("..")
    } else {
        bin_dir.join("..")
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let bin_dir = env_path("BOWERY_BIN_DIR").unwrap_or_else(default_bin_dir);
        let install_dir =
            env_path("BOWERY_INSTALL_DIR").unwrap_or_else(|| default_install_dir(&bin_dir));
        let updater_present = bin_dir.join(exe_name(UPDATER_BINARY)).is_file();
        Self {
            port: parse_env_u16("BOWERY_PORT", DEFAULT_PORT),
            use_updater: parse_env_bool("BOWERY_USE_UPDATER", updater_present),
            version_url: env_string("BOWERY_VERSION_URL")
                .unwrap_or_else(|| DEFAULT_VERSION_URL.to_string()),
            daemon_log: env_path("BOWERY_DAEMON_LOG"),
            health_attempts: parse_env_u32("BOWERY_HEALTH_ATTEMPTS", DEFAULT_HEALTH_ATTEMPTS),
            health_interval: Duration::from_millis(parse_env_u64(
                "BOWERY_HEALTH_INTERVAL_MS",
                DEFAULT_HEALTH_INTERVAL_MS,
            )),
            pusher_key: env_string("BOWERY_PUSHER_KEY")
                .unwrap_or_else(|| DEFAULT_PUSHER_KEY.to_string()),
            pusher_url: env_string("BOWERY_PUSHER_URL"),
            temp_dir: env_path("BOWERY_TMPDIR").unwrap_or_else(env::temp_dir),
            bin_dir,
            install_dir,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_updater(mut self, use_updater: bool) -> Self {
        self.use_updater = use_updater;
        self
    }

    pub fn with_daemon_log(mut self, path: Option<PathBuf>) -> Self {
        self.daemon_log = path;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn sync_ws_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("ws://localhost:{}/_/ws", self.port))
    }

    /// Pusher protocol 7 endpoint for the configured application key.
    pub fn pusher_url(&self) -> Result<Url, url::ParseError> {
        if let Some(url) = &self.pusher_url {
            return Url::parse(url);
        }
        let mut url = Url::parse(&format!(
            "ws://{DEFAULT_PUSHER_HOST}/app/{}",
            self.pusher_key
        ))?;
        url.query_pairs_mut()
            .append_pair("protocol", "7")
            .append_pair("client", "bowery-rust")
            .append_pair("version", env!("CARGO_PKG_VERSION"));
        Ok(url)
    }

    pub fn bin_dir(&self) -> &std::path::Path {
        &self.bin_dir
    }

    pub fn install_dir(&self) -> &std::path::Path {
        &self.install_dir
    }

    pub fn client_path(&self) -> PathBuf {
        self.bin_dir.join(exe_name(CLIENT_BINARY))
    }

    pub fn updater_path(&self) -> PathBuf {
        self.bin_dir.join(exe_name(UPDATER_BINARY))
    }

    pub fn use_updater(&self) -> bool {
        self.use_updater
    }

    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    pub fn daemon_log(&self) -> Option<&std::path::Path> {
        self.daemon_log.as_deref()
    }

    pub fn temp_dir(&self) -> &std::path::Path {
        &self.temp_dir
    }

    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy {
            max_attempts: self.health_attempts,
            interval: self.health_interval,
        }
    }
}
