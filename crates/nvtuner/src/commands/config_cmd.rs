//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Input, Select};

use nvtuner_config::scan_for_ssh_keys;
use nvtuner_core::{AuthMode, is_valid_ipv4, is_valid_port_str};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, RouterProfile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_router {
        let _ = writeln!(out, "default_router = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "keepalive_secs = {}", cfg.defaults.keepalive_secs);
    let _ = writeln!(out, "scratch_dir = \"{}\"", cfg.defaults.scratch_dir);

    let mut names: Vec<_> = cfg.routers.keys().collect();
    names.sort();
    for name in names {
        let r = &cfg.routers[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[routers.{name}]");
        let _ = writeln!(out, "address = \"{}\"", r.address);
        let _ = writeln!(out, "port = {}", r.port);
        let _ = writeln!(out, "auth_mode = \"{}\"", r.auth_mode);
        if let Some(ref u) = r.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if r.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref dir) = r.key_dir {
            let _ = writeln!(out, "key_dir = \"{}\"", dir.display());
        }
        if let Some(ref nick) = r.nickname {
            let _ = writeln!(out, "nickname = \"{nick}\"");
        }
    }

    out
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn router_not_found(cfg: &Config, name: &str) -> CliError {
    CliError::RouterNotFound {
        name: name.into(),
        available: config::available_routers(cfg),
    }
}

/// Offer to store the password in the system keyring or return it for
/// plaintext config. `None` means it went to the keyring.
fn prompt_password_storage(profile_name: &str, password: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_password(profile_name, password)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password.to_owned()))
    }
}

fn parse_port(value: &str) -> Result<u16, CliError> {
    let invalid = || CliError::Validation {
        field: "port".into(),
        reason: "must be a number between 1 and 65535".into(),
    };
    if !is_valid_port_str(value) {
        return Err(invalid());
    }
    value.trim().parse::<u16>().map_err(|_| invalid())
}

/// Apply one `config set` key to a profile.
fn set_profile_key(profile: &mut RouterProfile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "address" | "host" => {
            if !is_valid_ipv4(&value) {
                return Err(CliError::Validation {
                    field: "address".into(),
                    reason: format!("'{value}' is not a dotted-quad IPv4 address"),
                });
            }
            profile.address = value.trim().to_owned();
        }
        "port" => profile.port = parse_port(&value)?,
        "auth_mode" | "auth-mode" => {
            profile.auth_mode = value.parse().map_err(|_| CliError::Validation {
                field: "auth_mode".into(),
                reason: "must be 'password' or 'key-pair'".into(),
            })?;
        }
        "username" | "user" => profile.username = Some(value),
        "key_dir" | "key-dir" => profile.key_dir = Some(PathBuf::from(value)),
        "nickname" => profile.nickname = Some(value),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: address, port, auth_mode, \
                     username, key_dir, nickname"
                ),
            });
        }
    }
    Ok(())
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("nvtuner router setup");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let address: String = Input::new()
        .with_prompt("Router IPv4 address")
        .default("192.168.50.1".into())
        .validate_with(|input: &String| -> Result<(), &str> {
            if is_valid_ipv4(input) {
                Ok(())
            } else {
                Err("not a dotted-quad IPv4 address")
            }
        })
        .interact_text()
        .map_err(prompt_err)?;

    let port: String = Input::new()
        .with_prompt("SSH port")
        .default("22".into())
        .validate_with(|input: &String| -> Result<(), &str> {
            if is_valid_port_str(input) {
                Ok(())
            } else {
                Err("port must be 1-65535")
            }
        })
        .interact_text()
        .map_err(prompt_err)?;
    let port = parse_port(&port)?;

    let username: String = Input::new()
        .with_prompt("SSH username")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;

    let auth_choices = &["Password", "SSH key pair (id_rsa)"];
    let auth_selection = Select::new()
        .with_prompt("Authentication method")
        .items(auth_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let (auth_mode, password, key_dir) = if auth_selection == 0 {
        let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
        if pass.is_empty() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "password cannot be empty".into(),
            });
        }
        let stored = prompt_password_storage(&profile_name, &pass)?;
        (AuthMode::Password, stored, None)
    } else {
        let suggested = scan_for_ssh_keys()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if suggested.is_empty() {
            eprintln!("   No id_rsa pair found in ~/.ssh; enter the folder manually");
        }
        let dir: String = Input::new()
            .with_prompt("Key folder")
            .with_initial_text(suggested)
            .interact_text()
            .map_err(prompt_err)?;
        (AuthMode::KeyPair, None, Some(PathBuf::from(dir)))
    };

    let nickname: String = Input::new()
        .with_prompt("Nickname (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let profile = RouterProfile {
        address,
        port,
        auth_mode,
        username: Some(username),
        password,
        key_dir,
        nickname: (!nickname.is_empty()).then_some(nickname),
    };

    let mut cfg = config::load_config_or_default();
    cfg.routers.insert(profile_name.clone(), profile);
    cfg.default_router = Some(profile_name.clone());

    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active router: {profile_name}");
    eprintln!("\n  Test it: nvtuner probe");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            for profile in cfg.routers.values_mut() {
                if profile.password.is_some() {
                    profile.password = Some("****".into());
                }
            }
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_router_name(global, &cfg);

            let profile = cfg
                .routers
                .entry(profile_name.clone())
                .or_insert_with(|| RouterProfile::new(String::new()));
            set_profile_key(profile, &key, value)?;

            save_config(&cfg)?;
            eprintln!("✓ Set {key} on router '{profile_name}'");
            Ok(())
        }

        // ── List ────────────────────────────────────────────────────
        ConfigCommand::List => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_router.as_deref().unwrap_or("default");
            if cfg.routers.is_empty() {
                eprintln!("No routers configured. Run: nvtuner config init");
            } else {
                let mut names: Vec<_> = cfg.routers.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    let r = &cfg.routers[name];
                    println!("{name}{marker}\t{}:{}", r.address, r.port);
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.routers.contains_key(&name) {
                return Err(router_not_found(&cfg, &name));
            }
            cfg.default_router = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default router set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_router_name(global, &cfg);
            if !cfg.routers.contains_key(&profile_name) {
                return Err(router_not_found(&cfg, &profile_name));
            }

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for router '{profile_name}'");
            Ok(())
        }
    }
}
