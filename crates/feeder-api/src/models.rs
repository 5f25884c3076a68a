// Wire models for the feeder REST API.
//
// Field names follow the backend verbatim (a mix of snake_case and
// camelCase), so most structs carry explicit serde renames.

use serde::{Deserialize, Serialize};

/// Response of `POST /token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

/// A registered feeder device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    /// Device name doubles as the IoT hub device id and the push-channel key.
    pub device_name: String,
    pub user_id: i64,
}

/// Response of `GET /users/{username}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// Response of `GET /devices/{id}/foodLevel`. Value is a fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FoodLevelResponse {
    #[serde(rename = "foodLevel")]
    pub food_level: f64,
}

/// One leaderboard row from `GET /visits/topSpecies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub common_name: String,
    pub num_visits: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopSpeciesResponse {
    #[serde(rename = "topSpecies", default)]
    pub top_species: Vec<SpeciesCount>,
}

/// Body of both `GET` and `POST /devices/{id}/unwelcomeVisitors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwelcomeVisitorList {
    #[serde(rename = "unwelcomeVisitors", default)]
    pub unwelcome_visitors: Vec<String>,
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}
