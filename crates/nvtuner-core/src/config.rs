// ── Runtime connection configuration ──
//
// These types describe *which* router to talk to and *how* the session
// behaves. They carry credential data and tuning, but never touch disk.
// The CLI (via nvtuner-config) builds them and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::validate::{is_valid_ipv4, is_valid_port};

/// How the session authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AuthMode {
    /// Username + password.
    #[default]
    Password,
    /// Username + private key file (`id_rsa`) in a key folder.
    KeyPair,
}

/// Identity of a target router.
///
/// Immutable once a session starts. The password never leaves memory:
/// it is skipped by serde, so [`Router::to_bytes`] output is safe to
/// persist as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Router {
    /// Dotted-quad IPv4 address.
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<SecretString>,
    /// Folder holding the private key for [`AuthMode::KeyPair`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Router {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            auth_mode: AuthMode::Password,
            username: None,
            password: None,
            key_dir: None,
            nickname: None,
        }
    }

    /// Nickname if set, otherwise the address.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.address)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !is_valid_ipv4(&self.address) {
            return Err(CoreError::ValidationFailed {
                message: format!("'{}' is not a valid IPv4 address", self.address),
            });
        }
        if !is_valid_port(i64::from(self.port)) {
            return Err(CoreError::ValidationFailed {
                message: format!("{} is not a valid SSH port", self.port),
            });
        }
        Ok(())
    }

    /// Opaque record for the persistence collaborator.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ── Session tuning ───────────────────────────────────────────────

/// Remote commands the core issues. Overridable for firmwares that put
/// tools in odd places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommands {
    pub hostname: String,
    pub os: String,
    pub nvram_show: String,
}

impl Default for RemoteCommands {
    fn default() -> Self {
        Self {
            hostname: "hostname".into(),
            os: "uname -o".into(),
            nvram_show: "nvram show".into(),
        }
    }
}

/// Behaviour of a real session, constructed once at process start.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Heartbeat period. `Duration::ZERO` disables the heartbeat.
    pub keepalive_interval: Duration,
    /// Elapsed-time notification period.
    pub tick_interval: Duration,
    pub connect_timeout: Duration,
    /// Remote directory commit scripts are written to.
    pub scratch_dir: String,
    /// File name of the private key inside a router's key folder.
    pub private_key_name: String,
    pub commands: RemoteCommands,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(60),
            tick_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(30),
            scratch_dir: "/tmp/nvtuner".into(),
            private_key_name: "id_rsa".into(),
            commands: RemoteCommands::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn router() -> Router {
        Router {
            username: Some("admin".into()),
            password: Some(SecretString::from("hunter2".to_string())),
            nickname: Some("living-room".into()),
            ..Router::new("192.168.50.1", 22)
        }
    }

    #[test]
    fn bytes_round_trip_drops_password() {
        let r = router();
        let bytes = r.to_bytes().unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("hunter2"));

        let back = Router::from_bytes(&bytes).unwrap();
        assert_eq!(back.address, "192.168.50.1");
        assert_eq!(back.username.as_deref(), Some("admin"));
        assert_eq!(back.nickname.as_deref(), Some("living-room"));
        assert!(back.password.is_none());
        assert_eq!(r.password.unwrap().expose_secret(), "hunter2");
    }

    #[test]
    fn validate_rejects_bad_address_and_port() {
        assert!(router().validate().is_ok());
        assert!(Router::new("192.168.1", 22).validate().is_err());
        assert!(Router::new("192.168.1.1", 0).validate().is_err());
    }

    #[test]
    fn auth_mode_parses_kebab_case() {
        assert_eq!("key-pair".parse::<AuthMode>().unwrap(), AuthMode::KeyPair);
        assert_eq!(AuthMode::Password.to_string(), "password");
    }

    #[test]
    fn display_name_falls_back_to_address() {
        assert_eq!(router().display_name(), "living-room");
        assert_eq!(Router::new("10.0.0.1", 22).display_name(), "10.0.0.1");
    }
}
