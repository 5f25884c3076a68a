// ── Core error types ──
//
// User-facing errors from feeder-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<feeder_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to feeder backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Feeder backend request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("User '{username}' has no registered feeder devices")]
    NoDevices { username: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Unknown unwelcome visitor: {name}")]
    UnknownVisitor { name: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<feeder_api::Error> for CoreError {
    fn from(err: feeder_api::Error) -> Self {
        match err {
            feeder_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            feeder_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- log in again".into(),
            },
            feeder_api::Error::NotLoggedIn => CoreError::NotLoggedIn,
            feeder_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            feeder_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            feeder_api::Error::CannotBeABase(url) => CoreError::Config {
                message: format!("URL cannot be used as a base: {url}"),
            },
            feeder_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            feeder_api::Error::NotFound { path } => CoreError::NotFound { path },
            feeder_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            feeder_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            feeder_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
