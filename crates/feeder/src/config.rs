//! CLI-side configuration: applies global flags on top of the shared
//! `feeder-config` profiles.
//!
//! Core never sees these types -- it receives a pre-built `FeederConfig`.

use feeder_config::{Config, Overrides, Profile};
use feeder_core::FeederConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use feeder_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Global flags that take precedence over profile values.
pub fn overrides(global: &GlobalOpts) -> Overrides {
    Overrides {
        api_url: global.api_url.clone(),
        websocket_url: global.ws_url.clone(),
        username: global.username.clone(),
        insecure: global.insecure,
        timeout: global.timeout,
    }
}

/// Build a `FeederConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--api-url` plus environment credentials
/// are enough to run a command.
pub fn build_feeder_config(global: &GlobalOpts) -> Result<FeederConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly requested profile must exist
        None if global.profile.is_some() && global.api_url.is_none() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: cfg.available_profiles(),
            });
        }
        None => {
            let api_url = global.api_url.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            Profile {
                api_url,
                ..Profile::default()
            }
        }
    };

    let config = feeder_config::resolve_feeder_config(&profile, &profile_name, &overrides(global))?;
    tracing::debug!(
        profile = %profile_name,
        api_url = %config.api_url,
        websocket_url = %config.websocket_url,
        "resolved feeder config"
    );
    Ok(config)
}
