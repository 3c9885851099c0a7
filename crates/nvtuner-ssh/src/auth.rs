// Authentication material for SSH sessions.

use std::path::{Path, PathBuf};

use russh::keys::PrivateKey;
use secrecy::SecretString;

use crate::error::Error;

/// How to authenticate a session.
#[derive(Debug, Clone)]
pub enum SshAuth {
    /// Username + password credential pair.
    Password {
        username: String,
        password: SecretString,
    },
    /// Username + private key file on the local disk.
    PrivateKey { username: String, key_path: PathBuf },
}

impl SshAuth {
    pub fn username(&self) -> &str {
        match self {
            Self::Password { username, .. } | Self::PrivateKey { username, .. } => username,
        }
    }
}

/// Load an unencrypted private key from disk.
///
/// Distinguishes a missing file ([`Error::KeyNotFound`]) from one that
/// exists but cannot be decoded ([`Error::KeyLoad`]).
pub fn load_private_key(path: &Path) -> Result<PrivateKey, Error> {
    if !path.is_file() {
        return Err(Error::KeyNotFound {
            path: path.to_path_buf(),
        });
    }

    russh::keys::load_secret_key(path, None).map_err(|e| Error::KeyLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
