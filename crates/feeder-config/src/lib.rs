//! Shared configuration for the feeder CLI and TUI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `feeder_core::FeederConfig`. Both binaries
//! depend on this crate; the CLI layers its global flags on top through
//! [`Overrides`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use feeder_core::{Credentials, FeederConfig, TlsVerification};

/// Keyring service name under which passwords are stored.
pub const KEYRING_SERVICE: &str = "feeder";

/// Environment variable checked first for the password.
pub const PASSWORD_ENV: &str = "FEEDER_PASSWORD";

/// Environment variable used when a profile has no username.
pub const USERNAME_ENV: &str = "FEEDER_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Profile name chosen by `requested`, else the default profile.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up a profile, listing the alternatives when it is missing.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.available_profiles(),
            })
    }

    pub fn available_profiles(&self) -> String {
        if self.profiles.is_empty() {
            "(none)".into()
        } else {
            self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
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

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// REST API base URL (e.g., "http://localhost:8000").
    pub api_url: String,

    /// Push channel base URL. Derived from `api_url` when absent.
    pub websocket_url: Option<String>,

    /// Login username.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring).
    pub password: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Food level poll interval (seconds).
    pub food_poll_interval: Option<u64>,

    /// Fraction below which the low-food alert fires.
    pub low_food_threshold: Option<f64>,

    /// Rows in the species leaderboard.
    pub top_species_limit: Option<u32>,

    /// Initial unwelcome-visitor switches.
    pub unwelcome_visitors: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "feeder", "feeder").map_or_else(
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
    p.push("feeder");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, layered as defaults < file < `FEEDER_*` env.
///
/// Nested keys use a double underscore: `FEEDER_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FEEDER_").split("__"));

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
    debug!(path = %path.display(), "config written");
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(|e| ConfigError::Keyring(format!("failed to access keyring: {e}")))
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(password)
        .map_err(|e| ConfigError::Keyring(format!("failed to store password: {e}")))
}

/// Resolve the password: `FEEDER_PASSWORD`, then keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        std::env::var(PASSWORD_ENV).ok(),
        || keyring_entry(profile_name).ok()?.get_password().ok(),
    )
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    from_env: Option<String>,
    from_keyring: impl FnOnce() -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Some(pw) = from_env {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Some(pw) = from_keyring() {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve username + password for a profile.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
    username_override: Option<&str>,
) -> Result<Credentials, ConfigError> {
    let username = username_override
        .map(str::to_owned)
        .or_else(|| profile.username.clone())
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    let password = resolve_password(profile, profile_name)?;
    Ok(Credentials { username, password })
}

// ── Translation to FeederConfig ─────────────────────────────────────

/// Values that take precedence over the profile (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub websocket_url: Option<String>,
    pub username: Option<String>,
    pub insecure: bool,
    pub timeout: Option<u64>,
}

/// Default push channel base for an API URL: same host, `ws`/`wss`, `/ws`.
pub fn derive_websocket_url(api_url: &Url) -> Result<Url, ConfigError> {
    let scheme = match api_url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    };

    let mut url = api_url.clone();
    url.set_scheme(scheme).map_err(|()| ConfigError::Validation {
        field: "websocket_url".into(),
        reason: format!("cannot derive from {api_url}"),
    })?;
    url.set_path("/ws");
    url.set_query(None);
    Ok(url)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `FeederConfig` from a profile plus overrides.
///
/// This is the single boundary where config types cross into core types.
pub fn resolve_feeder_config(
    profile: &Profile,
    profile_name: &str,
    overrides: &Overrides,
) -> Result<FeederConfig, ConfigError> {
    // 1. Endpoints (override > profile > derived)
    let api_raw = overrides.api_url.as_deref().unwrap_or(&profile.api_url);
    let api_url = parse_url("api_url", api_raw)?;

    let websocket_url = match overrides
        .websocket_url
        .as_deref()
        .or(profile.websocket_url.as_deref())
    {
        Some(raw) => parse_url("websocket_url", raw)?,
        None => derive_websocket_url(&api_url)?,
    };

    // 2. Credentials
    let credentials = resolve_credentials(profile, profile_name, overrides.username.as_deref())?;

    // 3. TLS verification
    let tls = if overrides.insecure || profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 4. Tuning
    let mut config = FeederConfig::new(api_url, websocket_url, credentials);
    config.tls = tls;
    config.timeout = Duration::from_secs(
        overrides
            .timeout
            .or(profile.timeout)
            .unwrap_or_else(default_timeout),
    );
    if let Some(secs) = profile.food_poll_interval {
        config.food_poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(threshold) = profile.low_food_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Validation {
                field: "low_food_threshold".into(),
                reason: "must be between 0.0 and 1.0".into(),
            });
        }
        config.low_food_threshold = threshold;
    }
    if let Some(limit) = profile.top_species_limit {
        config.top_species_limit = limit;
    }
    if let Some(ref names) = profile.unwelcome_visitors {
        config.unwelcome_defaults.clone_from(names);
    }

    Ok(config)
}

/// Build a `FeederConfig` from a profile alone (TUI and other non-CLI consumers).
pub fn profile_to_feeder_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<FeederConfig, ConfigError> {
    resolve_feeder_config(profile, profile_name, &Overrides::default())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn profile() -> Profile {
        Profile {
            api_url: "https://feeder.example.com/api".into(),
            username: Some("ana".into()),
            password: Some("plain".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn websocket_url_is_derived_from_api_url() {
        let ws = derive_websocket_url(&"https://feeder.example.com/api".parse().expect("url"))
            .expect("derived");
        assert_eq!(ws.as_str(), "wss://feeder.example.com/ws");

        let ws = derive_websocket_url(&"http://localhost:8000".parse().expect("url"))
            .expect("derived");
        assert_eq!(ws.as_str(), "ws://localhost:8000/ws");
    }

    #[test]
    fn password_chain_prefers_env_then_keyring_then_plaintext() {
        let p = profile();

        let pw = resolve_password_with(&p, "default", Some("env".into()), || Some("ring".into()))
            .expect("resolved");
        assert_eq!(pw.expose_secret(), "env");

        let pw = resolve_password_with(&p, "default", None, || Some("ring".into()))
            .expect("resolved");
        assert_eq!(pw.expose_secret(), "ring");

        let pw = resolve_password_with(&p, "default", None, || None).expect("resolved");
        assert_eq!(pw.expose_secret(), "plain");

        let bare = Profile {
            password: None,
            ..profile()
        };
        assert!(matches!(
            resolve_password_with(&bare, "default", None, || None),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn overrides_win_over_profile() {
        let overrides = Overrides {
            api_url: Some("http://localhost:9000".into()),
            websocket_url: Some("ws://localhost:9001/stream".into()),
            username: Some("bo".into()),
            insecure: true,
            timeout: Some(3),
        };
        let config = resolve_feeder_config(&profile(), "default", &overrides).expect("config");

        assert_eq!(config.api_url.as_str(), "http://localhost:9000/");
        assert_eq!(config.websocket_url.as_str(), "ws://localhost:9001/stream");
        assert_eq!(config.credentials.username, "bo");
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn profile_tuning_is_applied() {
        let p = Profile {
            food_poll_interval: Some(15),
            low_food_threshold: Some(0.25),
            top_species_limit: Some(10),
            unwelcome_visitors: Some(vec!["squirrel".into()]),
            ca_cert: Some("/etc/ca.pem".into()),
            ..profile()
        };
        let config = profile_to_feeder_config(&p, "default").expect("config");

        assert_eq!(config.websocket_url.as_str(), "wss://feeder.example.com/ws");
        assert_eq!(config.food_poll_interval, Duration::from_secs(15));
        assert!((config.low_food_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.top_species_limit, 10);
        assert_eq!(config.unwelcome_defaults, vec!["squirrel"]);
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));
    }

    #[test]
    fn bad_threshold_is_rejected() {
        let p = Profile {
            low_food_threshold: Some(1.5),
            ..profile()
        };
        assert!(matches!(
            profile_to_feeder_config(&p, "default"),
            Err(ConfigError::Validation { ref field, .. }) if field == "low_food_threshold"
        ));
    }

    #[test]
    fn invalid_api_url_is_a_validation_error() {
        let p = Profile {
            api_url: "not a url".into(),
            ..profile()
        };
        assert!(matches!(
            profile_to_feeder_config(&p, "default"),
            Err(ConfigError::Validation { ref field, .. }) if field == "api_url"
        ));
    }

    #[test]
    fn file_and_env_layers_merge() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "home"

                [profiles.home]
                api_url = "http://localhost:8000"
                username = "ana"
                "#,
            )?;
            jail.set_env("FEEDER_DEFAULTS__TIMEOUT", "9");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.active_profile_name(None), "home");
            assert_eq!(cfg.active_profile_name(Some("work")), "work");
            assert_eq!(cfg.defaults.timeout, 9);
            assert_eq!(cfg.defaults.output, "table");

            let home = cfg.profile("home").map_err(|e| e.to_string())?;
            assert_eq!(home.username.as_deref(), Some("ana"));
            assert!(matches!(
                cfg.profile("work"),
                Err(ConfigError::ProfileNotFound { ref available, .. }) if available == "home"
            ));
            Ok(())
        });
    }

    #[test]
    fn save_then_load_round_trips_profiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile());
        save_config_to(&cfg, &path).expect("saved");

        let text = std::fs::read_to_string(&path).expect("written");
        assert!(text.contains("api_url = \"https://feeder.example.com/api\""));

        let loaded: Config = toml::from_str(&text).expect("parses");
        assert_eq!(loaded.available_profiles(), "default");
    }
}
