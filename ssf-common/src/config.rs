//! Configuration loading and root folder resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: the service logs a
//! warning and starts with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SSF_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Default bind address (loopback only)
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Default name of the cookie carrying the caller's role
pub const DEFAULT_ROLE_COOKIE: &str = "ssf_role";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "ssf.db";

/// Contents of the optional TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the SQLite database
    pub root_folder: Option<PathBuf>,
    /// Address the HTTP listener binds to
    pub bind_address: Option<String>,
    /// HTTP port
    pub port: Option<u16>,
    /// Cookie name read by the role middleware
    pub role_cookie: Option<String>,
    /// Default tracing filter when RUST_LOG is not set
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the config file if one exists, falling back to defaults on any problem
    ///
    /// Nothing is logged here: callers usually load the config before the
    /// tracing subscriber exists, so the outcome is returned for
    /// [`ConfigSource::log`] to report once logging is up.
    pub fn load_or_default(explicit: Option<&Path>) -> (Self, ConfigSource) {
        let (path, explicit) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return (Self::default(), ConfigSource::NoConfigDir),
            },
        };

        if !path.exists() {
            return (Self::default(), ConfigSource::Missing { path, explicit });
        }

        match Self::load(&path) {
            Ok(config) => (config, ConfigSource::Loaded(path)),
            Err(e) => (
                Self::default(),
                ConfigSource::Invalid {
                    path,
                    message: e.to_string(),
                },
            ),
        }
    }
}

/// Where the effective TOML config came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Loaded(PathBuf),
    /// `explicit` is set when the path was requested on the command line
    Missing { path: PathBuf, explicit: bool },
    Invalid { path: PathBuf, message: String },
    NoConfigDir,
}

impl ConfigSource {
    /// Report the outcome; only a requested-but-missing or broken file warns
    pub fn log(&self) {
        match self {
            ConfigSource::Loaded(path) => info!("Loaded config file: {}", path.display()),
            ConfigSource::Missing { path, explicit: true } => {
                warn!("Config file not found: {} (using defaults)", path.display())
            }
            ConfigSource::Missing { path, explicit: false } => {
                info!("No config file at {} (using defaults)", path.display())
            }
            ConfigSource::Invalid { message, .. } => {
                warn!("Ignoring unreadable config file: {}", message)
            }
            ConfigSource::NoConfigDir => info!("No config directory on this platform (using defaults)"),
        }
    }
}

/// Default config file location: `<config dir>/ssf/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ssf").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ssf"))
        .unwrap_or_else(|| PathBuf::from("./ssf_data"))
}

/// Resolve the root folder: CLI → `SSF_ROOT_FOLDER` → TOML → default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Values supplied on the command line (already merged with their env vars by clap)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub role_cookie: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub role_cookie: String,
}

impl ServiceConfig {
    /// Merge CLI overrides, environment, TOML and compiled defaults
    pub fn resolve(cli: CliOverrides, toml: &TomlConfig) -> Self {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), toml);

        let bind_address = cli
            .bind_address
            .or_else(|| toml.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let port = cli.port.or(toml.port).unwrap_or(DEFAULT_PORT);

        let role_cookie = cli
            .role_cookie
            .or_else(|| toml.role_cookie.clone())
            .unwrap_or_else(|| DEFAULT_ROLE_COOKIE.to_string());

        Self {
            root_folder,
            bind_address,
            port,
            role_cookie,
        }
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
