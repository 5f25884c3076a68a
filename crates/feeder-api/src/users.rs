// User lookup endpoint

use tracing::debug;

use crate::client::FeederClient;
use crate::error::Error;
use crate::models::User;

impl FeederClient {
    /// Fetch a user together with their registered devices.
    ///
    /// `GET /users/{username}`
    pub async fn get_user(&self, username: &str) -> Result<User, Error> {
        let url = self.endpoint(&["users", username])?;
        debug!(username, "fetching user");
        self.get(url).await
    }
}
