// ── Push-channel target ──

use std::fmt;

use url::Url;

use crate::error::CoreError;

/// Which device's visit channel to listen on, and where.
///
/// Value object: two targets are the same channel iff both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    pub base_url: Url,
    pub device_id: String,
}

impl ConnectionTarget {
    pub fn new(base_url: Url, device_id: impl Into<String>) -> Self {
        Self {
            base_url,
            device_id: device_id.into(),
        }
    }

    /// `{base_url}/{device_id}`, with the device id as one encoded segment.
    pub fn channel_url(&self) -> Result<Url, CoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::Config {
                message: format!("push channel URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .push(&self.device_id);
        Ok(url)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.base_url, self.device_id)
    }
}
