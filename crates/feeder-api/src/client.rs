// Feeder REST API HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection,
// and FastAPI-aware error mapping. Endpoint groups (users, devices, visits)
// are implemented as inherent methods in separate files to keep this
// module focused on transport mechanics.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ErrorDetail, TokenResponse};
use crate::transport::TransportConfig;

/// Raw HTTP client for the feeder backend.
///
/// Every endpoint except `POST /token` requires a bearer token; call
/// [`login`](Self::login) first. The token lives behind an `ArcSwapOption`
/// so a shared client can be re-authenticated without a lock.
pub struct FeederClient {
    http: reqwest::Client,
    base_url: Url,
    token: ArcSwapOption<SecretString>,
}

impl FeederClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://feeder.example.com` or
    /// `http://localhost:8000/api`. Paths are appended as segments, so a
    /// trailing slash is optional.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            token: ArcSwapOption::empty(),
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Token management ─────────────────────────────────────────────

    /// Whether a bearer token is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    /// Install a bearer token obtained elsewhere (e.g. a cached session).
    pub fn set_token(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    /// Forget the current bearer token.
    pub fn clear_token(&self) {
        self.token.store(None);
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange username/password for a bearer token via `POST /token`.
    ///
    /// The backend expects an OAuth2 password form body. On success the
    /// token is stored and attached to every subsequent request.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.endpoint(&["token"])?;
        debug!("logging in at {}", url);

        let resp = self
            .http
            .post(url)
            .form(&[
                ("username", username),
                ("password", password.expose_secret()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "Invalid username or password".into(),
            });
        }

        let token: TokenResponse = Self::decode(resp).await?;
        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::Authentication {
                message: format!("unsupported token type '{}'", token.token_type),
            });
        }

        self.set_token(SecretString::from(token.access_token));
        debug!("login successful");
        Ok(())
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{seg1}/{seg2}/...`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .authorized(self.http.get(url))?
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::decode(resp).await
    }

    /// Send an authenticated POST request with a JSON body.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .authorized(self.http.post(url))?
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::decode(resp).await
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.token.load();
        let token = guard.as_deref().ok_or(Error::NotLoggedIn)?;
        Ok(builder.bearer_auth(token.expose_secret()))
    }

    /// Map non-success statuses to typed errors, then decode the body.
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let path = resp.url().path().to_owned();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound { path });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI returns `{"detail": "..."}` or `{"detail": [validation errors]}`;
/// anything else is passed through verbatim.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(ErrorDetail {
            detail: serde_json::Value::String(msg),
        }) => msg,
        Ok(ErrorDetail { detail }) => detail.to_string(),
        Err(_) if body.is_empty() => "empty response body".into(),
        Err(_) => body.to_owned(),
    }
}
