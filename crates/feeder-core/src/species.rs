// ── Top visiting species leaderboard ──

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use feeder_api::{FeederClient, SpeciesCount};

use crate::error::CoreError;
use crate::stream::SnapshotStream;

/// Most recently fetched leaderboard, published to subscribers.
///
/// A failed refresh publishes an empty board, matching what the dashboard
/// shows when the stats endpoint is unavailable.
pub struct SpeciesBoard {
    limit: u32,
    board: watch::Sender<Arc<Vec<SpeciesCount>>>,
}

impl SpeciesBoard {
    pub fn new(limit: u32) -> Self {
        let (board, _) = watch::channel(Arc::new(Vec::new()));
        Self { limit, board }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn snapshot(&self) -> Arc<Vec<SpeciesCount>> {
        self.board.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream<Vec<SpeciesCount>> {
        SnapshotStream::new(self.board.subscribe())
    }

    /// Fetch the top `limit` species (or the configured limit) and publish.
    pub async fn refresh(
        &self,
        client: &FeederClient,
        limit: Option<u32>,
    ) -> Result<Arc<Vec<SpeciesCount>>, CoreError> {
        let limit = limit.unwrap_or(self.limit);
        match client.top_species(limit).await {
            Ok(rows) => {
                debug!(rows = rows.len(), "species leaderboard refreshed");
                let rows = Arc::new(rows);
                self.board.send_replace(Arc::clone(&rows));
                Ok(rows)
            }
            Err(e) => {
                warn!(error = %e, "species leaderboard refresh failed");
                self.board.send_replace(Arc::new(Vec::new()));
                Err(e.into())
            }
        }
    }
}
