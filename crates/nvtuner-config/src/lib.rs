//! Router profiles for nvtuner.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! SSH key discovery, and translation into `nvtuner_core::Router` /
//! `SessionConfig`. The core never reads these types; the CLI layers
//! its `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use nvtuner_core::{AuthMode, Router, SessionConfig, is_valid_ipv4, is_valid_port};

const KEYRING_SERVICE: &str = "nvtuner";
const PRIVATE_KEY: &str = "id_rsa";
const PUBLIC_KEY: &str = "id_rsa.pub";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for router '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Router used when `--router` is not given.
    pub default_router: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named router profiles.
    #[serde(default)]
    pub routers: HashMap<String, RouterProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_router: Some("default".into()),
            defaults: Defaults::default(),
            routers: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// SSH connect timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Heartbeat period in seconds; 0 turns the heartbeat off.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Remote directory commit scripts are written to.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            keepalive_secs: default_keepalive(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_keepalive() -> u64 {
    60
}
fn default_scratch_dir() -> String {
    "/tmp/nvtuner".into()
}

/// A named router profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterProfile {
    /// Dotted-quad IPv4 address of the router.
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `password` or `key-pair`.
    #[serde(default)]
    pub auth_mode: AuthMode,

    pub username: Option<String>,

    /// Plaintext password (prefer keyring or `NVTUNER_PASSWORD`).
    pub password: Option<String>,

    /// Folder holding `id_rsa` for key-pair auth. Falls back to `~/.ssh`.
    pub key_dir: Option<PathBuf>,

    pub nickname: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl RouterProfile {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: default_port(),
            auth_mode: AuthMode::default(),
            username: None,
            password: None,
            key_dir: None,
            nickname: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "nvtuner", "nvtuner").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nvtuner");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Layer defaults, the TOML file at `path` (if present) and `NVTUNER_*`
/// environment variables. Nested keys use `__`: `NVTUNER_DEFAULTS__TIMEOUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NVTUNER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Look up a password: `NVTUNER_PASSWORD`, then the system keyring, then
/// the plaintext value in the profile.
pub fn lookup_password(profile: &RouterProfile, profile_name: &str) -> Option<SecretString> {
    // 1. Env var
    if let Ok(pw) = std::env::var("NVTUNER_PASSWORD") {
        debug!(profile = profile_name, "password taken from environment");
        return Some(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            debug!(profile = profile_name, "password taken from keyring");
            return Some(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    profile
        .password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

/// Like [`lookup_password`], but a missing password is an error.
pub fn resolve_password(
    profile: &RouterProfile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    lookup_password(profile, profile_name).ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a router password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── SSH key discovery ───────────────────────────────────────────────

/// `true` when `folder` holds both halves of an `id_rsa` key pair.
pub fn folder_contains_ssh_keys(folder: &Path) -> bool {
    folder.join(PUBLIC_KEY).is_file() && folder.join(PRIVATE_KEY).is_file()
}

/// `~/.ssh` if it holds a key pair.
pub fn scan_for_ssh_keys() -> Option<PathBuf> {
    let home = BaseDirs::new()?.home_dir().to_path_buf();
    scan_for_ssh_keys_in(&home)
}

pub fn scan_for_ssh_keys_in(home: &Path) -> Option<PathBuf> {
    let ssh_dir = home.join(".ssh");
    folder_contains_ssh_keys(&ssh_dir).then_some(ssh_dir)
}

// ── Translation into core types ─────────────────────────────────────

/// Build a `Router` from a profile.
///
/// Password mode leaves `password` unset when nothing in the credential
/// chain has one, so an interactive caller can prompt for it.
pub fn profile_to_router(profile: &RouterProfile, profile_name: &str) -> Result<Router, ConfigError> {
    let address = profile.address.trim();
    if !is_valid_ipv4(address) {
        return Err(ConfigError::Validation {
            field: "address".into(),
            reason: format!("'{}' is not a dotted-quad IPv4 address", profile.address),
        });
    }
    if !is_valid_port(i64::from(profile.port)) {
        return Err(ConfigError::Validation {
            field: "port".into(),
            reason: format!("{} is outside 1-65535", profile.port),
        });
    }

    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("NVTUNER_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    let (password, key_dir) = match profile.auth_mode {
        AuthMode::Password => (lookup_password(profile, profile_name), None),
        AuthMode::KeyPair => {
            let dir = profile
                .key_dir
                .clone()
                .or_else(scan_for_ssh_keys)
                .ok_or_else(|| ConfigError::Validation {
                    field: "key_dir".into(),
                    reason: "no key folder configured and ~/.ssh holds no id_rsa pair".into(),
                })?;
            (None, Some(dir))
        }
    };

    Ok(Router {
        address: address.to_owned(),
        port: profile.port,
        auth_mode: profile.auth_mode,
        username: Some(username),
        password,
        key_dir,
        nickname: Some(
            profile
                .nickname
                .clone()
                .unwrap_or_else(|| profile_name.to_owned()),
        ),
    })
}

/// Session tuning from the `[defaults]` table.
pub fn session_config(defaults: &Defaults) -> SessionConfig {
    SessionConfig {
        keepalive_interval: Duration::from_secs(defaults.keepalive_secs),
        connect_timeout: Duration::from_secs(defaults.timeout),
        scratch_dir: defaults.scratch_dir.clone(),
        ..SessionConfig::default()
    }
}
