// Device endpoints
//
// Food level telemetry and the unwelcome-visitor filter stored in the
// device twin's desired properties.

use tracing::debug;

use crate::client::FeederClient;
use crate::error::Error;
use crate::models::{FoodLevelResponse, UnwelcomeVisitorList};

impl FeederClient {
    /// Current food level as a fraction in `0.0..=1.0`.
    ///
    /// `GET /devices/{device_id}/foodLevel`
    pub async fn food_level(&self, device_id: &str) -> Result<f64, Error> {
        let url = self.endpoint(&["devices", device_id, "foodLevel"])?;
        let resp: FoodLevelResponse = self.get(url).await?;
        debug!(device_id, level = resp.food_level, "food level");
        Ok(resp.food_level)
    }

    /// Visitor species the device is currently told to scare off.
    ///
    /// `GET /devices/{device_id}/unwelcomeVisitors`
    pub async fn unwelcome_visitors(&self, device_id: &str) -> Result<Vec<String>, Error> {
        let url = self.endpoint(&["devices", device_id, "unwelcomeVisitors"])?;
        let resp: UnwelcomeVisitorList = self.get(url).await?;
        Ok(resp.unwelcome_visitors)
    }

    /// Replace the device's unwelcome-visitor list.
    ///
    /// `POST /devices/{device_id}/unwelcomeVisitors`. The backend echoes the
    /// updated desired properties, returned untyped.
    pub async fn set_unwelcome_visitors(
        &self,
        device_id: &str,
        visitors: &[String],
    ) -> Result<serde_json::Value, Error> {
        let url = self.endpoint(&["devices", device_id, "unwelcomeVisitors"])?;
        debug!(device_id, ?visitors, "updating unwelcome visitors");
        let body = UnwelcomeVisitorList {
            unwelcome_visitors: visitors.to_vec(),
        };
        self.post(url, &body).await
    }
}
