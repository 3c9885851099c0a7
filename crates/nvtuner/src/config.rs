//! CLI configuration: thin wrapper around `nvtuner_config`.
//!
//! Re-exports the shared types and adds resolution that respects the
//! `GlobalOpts` overrides (--host, --port, --user, --key-dir, --timeout).

use std::io::IsTerminal;
use std::time::Duration;

use secrecy::SecretString;

use nvtuner_core::{AuthMode, Router, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nvtuner_config::{
    Config, RouterProfile, config_path, load_config_or_default, save_config, store_password,
};

/// Everything a router-bound command needs.
#[derive(Debug, Clone)]
pub struct Target {
    pub router: Router,
    pub session: SessionConfig,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active router name from CLI flags and config.
pub fn active_router_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .router
        .clone()
        .or_else(|| config.default_router.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for error help text.
pub fn available_routers(config: &Config) -> String {
    let mut names: Vec<_> = config.routers.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Apply flag overrides on top of a profile (or an empty one for `--host`).
fn apply_overrides(profile: &mut RouterProfile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.address.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = port;
    }
    if let Some(ref user) = global.user {
        profile.username = Some(user.clone());
    }
    if let Some(ref dir) = global.key_dir {
        profile.auth_mode = AuthMode::KeyPair;
        profile.key_dir = Some(dir.clone());
    }
}

/// Build the target router and session tuning from config + flags.
pub fn resolve_target(global: &GlobalOpts, config: &Config) -> Result<Target, CliError> {
    let name = active_router_name(global, config);

    let mut profile = match (config.routers.get(&name), global.host.as_deref()) {
        (Some(profile), _) => profile.clone(),
        (None, Some(host)) => RouterProfile::new(host),
        (None, None) if global.router.is_some() => {
            return Err(CliError::RouterNotFound {
                name,
                available: available_routers(config),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };
    apply_overrides(&mut profile, global);

    let mut router = nvtuner_config::profile_to_router(&profile, &name)?;
    if router.auth_mode == AuthMode::Password && router.password.is_none() {
        router.password = Some(prompt_password(&router, &name)?);
    }

    let mut session = nvtuner_config::session_config(&config.defaults);
    if let Some(secs) = global.timeout {
        session.connect_timeout = Duration::from_secs(secs);
    }

    Ok(Target { router, session })
}

/// Ask for the SSH password when nothing in the credential chain has one.
fn prompt_password(router: &Router, name: &str) -> Result<SecretString, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoCredentials {
            router: name.into(),
        });
    }
    let prompt = format!(
        "Password for {}@{}: ",
        router.username.as_deref().unwrap_or_default(),
        router.address
    );
    let password = rpassword::prompt_password(prompt)?;
    Ok(SecretString::from(password))
}
