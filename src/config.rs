use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::mail::fetcher::DEFAULT_RECENT_WINDOW;
use crate::mail::mime::{DEFAULT_MAX_DEPTH, ResolverConfig};

pub const ENV_USER: &str = "GOMAIL_USER";
pub const ENV_PASS: &str = "GOMAIL_PASS";
pub const ENV_SERVER: &str = "GOMAIL_IMAP_SERVER";

const DEFAULT_PORT: u16 = 993;
const DEFAULT_MAILBOX: &str = "INBOX";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Optional settings file. Every field may be omitted; the password is
/// never read from here.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// `host` or `host:port`.
    pub imap_server: Option<String>,
    pub user: Option<String>,
    pub mailbox: Option<String>,
    pub recent_window: Option<u32>,
    pub max_mime_depth: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Values taken from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub imap_server: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v: &String| !v.is_empty());
        Self {
            user: var(ENV_USER),
            password: var(ENV_PASS),
            imap_server: var(ENV_SERVER),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub mailbox: String,
    /// Socket read/write timeout.
    pub io_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub imap: ImapSettings,
    pub recent_window: u32,
    pub resolver: ResolverConfig,
    /// How long the list view waits for a body before giving up on it.
    pub fetch_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("termmail"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_log_path() -> Result<PathBuf> {
    let p = config_dir()?;
    fs::create_dir_all(&p)?;
    Ok(p.join("termmail.log"))
}

/// Read the settings file; a missing file is the same as an empty one.
pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Split `host[:port]`, defaulting to the IMAPS port.
pub fn parse_server(addr: &str) -> Result<(String, u16), ConfigError> {
    let addr = addr.trim();
    let bad = || ConfigError::BadServer(addr.to_string());

    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| bad())?),
        None => (addr, DEFAULT_PORT),
    };
    if host.is_empty() || host.contains(':') || port == 0 {
        return Err(bad());
    }
    Ok((host.to_string(), port))
}

/// Merge file and environment; the environment wins.
pub fn resolve(file: FileConfig, env: EnvConfig) -> Result<Settings, ConfigError> {
    let server = env
        .imap_server
        .or(file.imap_server)
        .ok_or(ConfigError::Missing {
            setting: "IMAP server",
            env_var: ENV_SERVER,
        })?;
    let (host, port) = parse_server(&server)?;

    let user = env.user.or(file.user).ok_or(ConfigError::Missing {
        setting: "IMAP user",
        env_var: ENV_USER,
    })?;
    let password = env.password.ok_or(ConfigError::Missing {
        setting: "IMAP password",
        env_var: ENV_PASS,
    })?;

    let fetch_timeout =
        Duration::from_secs(file.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS).max(1));

    Ok(Settings {
        imap: ImapSettings {
            host,
            port,
            user,
            password,
            mailbox: file.mailbox.unwrap_or_else(|| DEFAULT_MAILBOX.to_string()),
            io_timeout: fetch_timeout,
        },
        recent_window: file.recent_window.unwrap_or(DEFAULT_RECENT_WINDOW),
        resolver: ResolverConfig {
            max_depth: file.max_mime_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        },
        fetch_timeout,
        log_file: file.log_file,
    })
}
