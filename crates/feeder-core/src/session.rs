// ── Authenticated session ──
//
// Logging in yields a bearer token (held by the client) and the device the
// dashboard works with: the first device registered to the user.

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info};

use feeder_api::{Device, FeederClient};

use crate::error::CoreError;

/// Who is logged in and which feeder they are looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    username: String,
    device: Device,
}

impl Session {
    /// Log in and resolve the user's device.
    pub async fn login(
        client: &FeederClient,
        username: &str,
        password: &SecretString,
    ) -> Result<Self, CoreError> {
        client.login(username, password).await?;
        debug!(username, "token acquired");

        let device = resolve_device(client, username).await?;
        info!(username, device = %device.device_name, "session established");

        Ok(Self {
            username: username.to_owned(),
            device,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Identifier used in device routes and the push channel.
    pub fn device_id(&self) -> &str {
        &self.device.device_name
    }
}

/// First device registered to `username`.
pub async fn resolve_device(client: &FeederClient, username: &str) -> Result<Device, CoreError> {
    let user = client.get_user(username).await?;
    user.devices
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::NoDevices {
            username: username.to_owned(),
        })
}
