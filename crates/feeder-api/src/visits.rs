// Visit statistics endpoints

use tracing::debug;

use crate::client::FeederClient;
use crate::error::Error;
use crate::models::{SpeciesCount, TopSpeciesResponse};

impl FeederClient {
    /// The most frequent visiting species, highest count first.
    ///
    /// `GET /visits/topSpecies?limit={limit}`
    pub async fn top_species(&self, limit: u32) -> Result<Vec<SpeciesCount>, Error> {
        let mut url = self.endpoint(&["visits", "topSpecies"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        debug!(limit, "fetching top species");
        let resp: TopSpeciesResponse = self.get(url).await?;
        Ok(resp.top_species)
    }
}
