// ── Feeder controller ──
//
// Full lifecycle management for a dashboard session: login and device
// resolution, the food poll task, the species leaderboard, the unwelcome
// visitor filter, and the live visit feed.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use feeder_api::{FeederClient, SpeciesCount};

use crate::config::FeederConfig;
use crate::error::CoreError;
use crate::feed::{ChannelState, ConnectionTarget, FeedHandle, LiveFeed, VisitRecord};
use crate::food::{FoodLevel, FoodMonitor};
use crate::session::Session;
use crate::species::SpeciesBoard;
use crate::stream::SnapshotStream;
use crate::visitors::{UnwelcomeVisitors, VisitorToggle};

// ── ConnectionState ──────────────────────────────────────────────

/// Session state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Feeder ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<FeederInner>`. Must be created inside a
/// Tokio runtime: the visit feed runs on its own task from the start so
/// renderers can subscribe before connecting.
#[derive(Clone)]
pub struct Feeder {
    inner: Arc<FeederInner>,
}

struct FeederInner {
    config: FeederConfig,
    client: FeederClient,
    session: ArcSwapOption<Session>,
    connection_state: watch::Sender<ConnectionState>,
    food_level: watch::Sender<FoodLevel>,
    food_alert: watch::Sender<bool>,
    species: SpeciesBoard,
    visitors: Mutex<UnwelcomeVisitors>,
    visitors_tx: watch::Sender<Arc<Vec<VisitorToggle>>>,
    feed: FeedHandle,
    /// Cancels the feed task; fired when the last handle goes away.
    cancel: CancellationToken,
    /// Cancels per-connection background tasks.
    session_cancel: Mutex<Option<CancellationToken>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for FeederInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Feeder {
    /// Create a new Feeder from configuration. Does NOT log in --
    /// call [`connect()`](Self::connect) to authenticate and start background tasks.
    pub fn new(config: FeederConfig) -> Result<Self, CoreError> {
        let client = FeederClient::new(config.api_url.clone(), &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    /// Create a Feeder around an existing REST client.
    pub fn with_client(config: FeederConfig, client: FeederClient) -> Self {
        let cancel = CancellationToken::new();
        let feed = LiveFeed::websocket(config.history_capacity);
        let (feed, _task) = FeedHandle::spawn(feed, cancel.child_token());

        let visitors = UnwelcomeVisitors::with_defaults(&config.unwelcome_defaults);
        let (visitors_tx, _) = watch::channel(Arc::new(visitors.toggles()));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (food_level, _) = watch::channel(FoodLevel::FULL);
        let (food_alert, _) = watch::channel(false);
        let species = SpeciesBoard::new(config.top_species_limit);

        Self {
            inner: Arc::new(FeederInner {
                config,
                client,
                session: ArcSwapOption::empty(),
                connection_state,
                food_level,
                food_alert,
                species,
                visitors: Mutex::new(visitors),
                visitors_tx,
                feed,
                cancel,
                session_cancel: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the configuration.
    pub fn config(&self) -> &FeederConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in and resolve the device, without starting any background task.
    pub async fn authenticate(&self) -> Result<Arc<Session>, CoreError> {
        let creds = &self.inner.config.credentials;
        let session = Arc::new(
            Session::login(&self.inner.client, &creds.username, &creds.password).await?,
        );
        self.inner.session.store(Some(Arc::clone(&session)));
        Ok(session)
    }

    /// Log in, then start the food poll task, load the visitor filter and
    /// the species board, and point the live feed at the user's device.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let session = match self.authenticate().await {
            Ok(session) => session,
            Err(e) => {
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Failed);
                return Err(e);
            }
        };

        if let Err(e) = self.refresh_unwelcome().await {
            warn!(error = %e, "could not load unwelcome visitors, keeping defaults");
        }
        if let Err(e) = self.top_species(None).await {
            debug!(error = %e, "initial species refresh failed");
        }

        // Spawn background tasks
        let cancel = self.inner.cancel.child_token();
        {
            let mut handles = self.inner.task_handles.lock().await;
            handles.push(tokio::spawn(food_poll_task(
                Arc::downgrade(&self.inner),
                session.device_id().to_owned(),
                cancel.clone(),
            )));
        }
        if let Some(previous) = self.inner.session_cancel.lock().await.replace(cancel) {
            previous.cancel();
        }

        let target = ConnectionTarget::new(
            self.inner.config.websocket_url.clone(),
            session.device_id(),
        );
        self.inner.feed.connect(target).await?;

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(device = session.device_id(), "feeder connected");
        Ok(())
    }

    /// Stop background tasks and close the visit channel.
    ///
    /// The visit history stays readable until the next `connect`.
    pub async fn disconnect(&self) {
        if let Some(cancel) = self.inner.session_cancel.lock().await.take() {
            cancel.cancel();
        }

        // Join all background tasks
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Err(e) = self.inner.feed.teardown().await {
            debug!(error = %e, "feed already stopped");
        }

        self.inner.client.clear_token();
        self.inner.session.store(None);
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// One-shot: authenticate, run closure, disconnect.
    ///
    /// For the CLI: no food polling and no live feed, just the session.
    pub async fn oneshot<F, Fut, T>(config: FeederConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Feeder) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let feeder = Feeder::new(config)?;
        feeder.authenticate().await?;
        let result = f(feeder.clone()).await;
        feeder.disconnect().await;
        result
    }

    // ── Session ──────────────────────────────────────────────────

    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.session.load_full()
    }

    fn device_id(&self) -> Result<String, CoreError> {
        self.inner
            .session
            .load()
            .as_ref()
            .map(|s| s.device_id().to_owned())
            .ok_or(CoreError::NotLoggedIn)
    }

    // ── Food level ───────────────────────────────────────────────

    /// Fetch the food level once. Errors are returned, not masked.
    pub async fn fetch_food_level(&self) -> Result<FoodLevel, CoreError> {
        let device_id = self.device_id()?;
        let fraction = self.inner.client.food_level(&device_id).await?;
        Ok(FoodLevel::new(fraction))
    }

    pub fn food_level(&self) -> watch::Receiver<FoodLevel> {
        self.inner.food_level.subscribe()
    }

    /// `true` while the low-food alert is raised.
    pub fn food_alert(&self) -> watch::Receiver<bool> {
        self.inner.food_alert.subscribe()
    }

    // ── Species leaderboard ──────────────────────────────────────

    /// Refresh the leaderboard (configured limit unless overridden).
    pub async fn top_species(&self, limit: Option<u32>) -> Result<Arc<Vec<SpeciesCount>>, CoreError> {
        self.inner.species.refresh(&self.inner.client, limit).await
    }

    pub fn species(&self) -> SnapshotStream<Vec<SpeciesCount>> {
        self.inner.species.subscribe()
    }

    // ── Unwelcome visitors ───────────────────────────────────────

    /// Current switches.
    pub async fn unwelcome_visitors(&self) -> Vec<VisitorToggle> {
        self.inner.visitors.lock().await.toggles()
    }

    pub fn unwelcome_stream(&self) -> SnapshotStream<Vec<VisitorToggle>> {
        SnapshotStream::new(self.inner.visitors_tx.subscribe())
    }

    /// Merge the list stored on the device into the local switches.
    pub async fn refresh_unwelcome(&self) -> Result<Vec<VisitorToggle>, CoreError> {
        let device_id = self.device_id()?;
        let reported = self.inner.client.unwelcome_visitors(&device_id).await?;

        let mut visitors = self.inner.visitors.lock().await;
        visitors.load(&reported);
        let toggles = visitors.toggles();
        self.inner.visitors_tx.send_replace(Arc::new(toggles.clone()));
        Ok(toggles)
    }

    /// Flip one switch and push the resulting list to the device.
    ///
    /// The switch is flipped back if the device rejects the update.
    pub async fn toggle_unwelcome(&self, name: &str) -> Result<Vec<String>, CoreError> {
        let device_id = self.device_id()?;
        let mut visitors = self.inner.visitors.lock().await;
        let enabled = visitors.toggle(name)?;

        if let Err(e) = self
            .inner
            .client
            .set_unwelcome_visitors(&device_id, &enabled)
            .await
        {
            let _ = visitors.toggle(name);
            return Err(e.into());
        }

        self.inner
            .visitors_tx
            .send_replace(Arc::new(visitors.toggles()));
        info!(?enabled, "unwelcome visitors updated");
        Ok(enabled)
    }

    /// Enable exactly `names` and push the list to the device.
    pub async fn set_unwelcome(&self, names: &[String]) -> Result<Vec<String>, CoreError> {
        let device_id = self.device_id()?;
        let mut visitors = self.inner.visitors.lock().await;
        let mut updated = visitors.clone();
        let enabled = updated.set_enabled(names);

        self.inner
            .client
            .set_unwelcome_visitors(&device_id, &enabled)
            .await?;

        *visitors = updated;
        self.inner
            .visitors_tx
            .send_replace(Arc::new(visitors.toggles()));
        Ok(enabled)
    }

    // ── Live visit feed ──────────────────────────────────────────

    pub fn visit_history(&self) -> SnapshotStream<Vec<VisitRecord>> {
        self.inner.feed.history()
    }

    pub fn feed_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.feed.state()
    }

    /// Point the live feed at another device of the same backend.
    pub async fn watch_device(&self, device_id: &str) -> Result<(), CoreError> {
        let target = ConnectionTarget::new(self.inner.config.websocket_url.clone(), device_id);
        self.inner.feed.connect(target).await
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll the food level and drive the low-food alert.
/// The task must not keep the feeder alive: dropping the last handle
/// has to reach `FeederInner::drop`.
async fn food_poll_task(feeder: Weak<FeederInner>, device_id: String, cancel: CancellationToken) {
    let Some((threshold, interval)) = feeder.upgrade().map(|inner| {
        (inner.config.low_food_threshold, inner.config.food_poll_interval)
    }) else {
        return;
    };
    let mut monitor = FoodMonitor::new(threshold);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = feeder.upgrade() else { break };
                let result = inner
                    .client
                    .food_level(&device_id)
                    .await
                    .map_err(CoreError::from);
                let (level, _) = monitor.observe(result);
                inner.food_level.send_replace(level);
                inner.food_alert.send_replace(monitor.alert().is_raised());
            }
        }
    }
    debug!("food poll task exiting");
}
