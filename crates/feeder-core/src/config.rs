// ── Runtime connection configuration ──
//
// These types describe *how* to reach the feeder backend and how the
// dashboard services behave. They carry credential data and tuning, but
// never touch disk. The CLI/TUI constructs a `FeederConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use feeder_api::transport::{TlsMode, TransportConfig};

/// Username/password pair exchanged for a bearer token at login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development backends).
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_transport(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Default unwelcome-visitor filter: every entry starts enabled.
pub const DEFAULT_UNWELCOME_VISITORS: [&str; 3] = ["bear", "cat", "dog"];

/// Configuration for one feeder dashboard session.
///
/// Built by CLI/TUI, passed to `Feeder` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct FeederConfig {
    /// REST API base URL (e.g. `http://localhost:8000`).
    pub api_url: Url,
    /// Push-channel base URL; the device id is appended as a path segment.
    pub websocket_url: Url,
    pub credentials: Credentials,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// How often the food level is polled.
    pub food_poll_interval: Duration,
    /// Fraction below which the low-food alert is raised.
    pub low_food_threshold: f64,
    /// Rows fetched for the species leaderboard.
    pub top_species_limit: u32,
    /// Visit history length.
    pub history_capacity: usize,
    /// Initial unwelcome-visitor entries, all enabled.
    pub unwelcome_defaults: Vec<String>,
}

impl FeederConfig {
    /// Config with the given endpoints and credentials and default tuning.
    pub fn new(api_url: Url, websocket_url: Url, credentials: Credentials) -> Self {
        Self {
            api_url,
            websocket_url,
            credentials,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            food_poll_interval: Duration::from_secs(5),
            low_food_threshold: 0.1,
            top_species_limit: 5,
            history_capacity: crate::feed::DEFAULT_HISTORY_CAPACITY,
            unwelcome_defaults: DEFAULT_UNWELCOME_VISITORS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }

    /// Transport settings for the REST client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_transport(),
            timeout: self.timeout,
        }
    }
}
