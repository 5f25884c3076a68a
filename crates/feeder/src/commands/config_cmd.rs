//! Config subcommand handlers.

use dialoguer::{Input, Select};

use feeder_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::{self, prompt_err};

const REDACTED: &str = "****";

/// Copy of `cfg` with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    cfg
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    fn parse<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
        value.parse().map_err(|_| CliError::Validation {
            field: field.into(),
            reason: format!("must be {expected}"),
        })
    }

    match key {
        "api_url" | "api-url" => profile.api_url = value,
        "websocket_url" | "websocket-url" | "ws_url" | "ws-url" => {
            profile.websocket_url = Some(value);
        }
        "username" => profile.username = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse("insecure", &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse("timeout", &value, "a number (seconds)")?),
        "food_poll_interval" | "food-poll-interval" => {
            profile.food_poll_interval =
                Some(parse("food_poll_interval", &value, "a number (seconds)")?);
        }
        "low_food_threshold" | "low-food-threshold" => {
            let threshold: f64 = parse("low_food_threshold", &value, "a fraction")?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(CliError::Validation {
                    field: "low_food_threshold".into(),
                    reason: "must be between 0.0 and 1.0".into(),
                });
            }
            profile.low_food_threshold = Some(threshold);
        }
        "top_species_limit" | "top-species-limit" => {
            profile.top_species_limit = Some(parse("top_species_limit", &value, "a number")?);
        }
        "unwelcome_visitors" | "unwelcome-visitors" => {
            profile.unwelcome_visitors = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect(),
            );
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: api_url, websocket_url, \
                     username, ca_cert, insecure, timeout, food_poll_interval, \
                     low_food_threshold, top_species_limit, unwelcome_visitors"
                ),
            });
        }
    }
    Ok(())
}

/// Ask where to keep a password; returns the plaintext to store in the
/// profile, or `None` when it went to the keyring.
fn store_password_interactive(profile_name: &str, password: String) -> Result<Option<String>, CliError> {
    let store_choices = &[
        "Store password in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if store_selection == 0 {
        feeder_config::store_password(profile_name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("Feeder CLI: configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            // 1. Profile name
            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. Backend URL
            let api_url: String = Input::new()
                .with_prompt("Feeder API URL")
                .default("http://localhost:8000".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 3. Credentials
            let username: String = Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(prompt_err)?;
            let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;

            if username.is_empty() || password.is_empty() {
                return Err(CliError::Validation {
                    field: "credentials".into(),
                    reason: "username and password cannot be empty".into(),
                });
            }
            let password = store_password_interactive(&profile_name, password)?;

            // 4. Build profile and config, keeping other profiles
            let profile = Profile {
                api_url,
                username: Some(username),
                password,
                ..Profile::default()
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            // 5. Write config
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: feeder login");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            util::status(global, &format!("✓ Set {key} on profile '{profile_name}'"));
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: feeder config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            cfg.profile(&name)?;

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            util::status(global, &format!("✓ Default profile set to '{name}'"));
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name =
                profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            cfg.profile(&profile_name)?;

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            feeder_config::store_password(&profile_name, &secret)?;
            util::status(
                global,
                &format!("✓ Password stored in system keyring for profile '{profile_name}'"),
            );
            Ok(())
        }
    }
}
