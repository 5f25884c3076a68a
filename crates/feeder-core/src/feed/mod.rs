// ── Live visit feed ──
//
// Owns at most one push channel, keyed by a `ConnectionTarget`, and a
// bounded most-recent-first history of visit records derived from that
// channel's messages. All channel callbacks arrive as `FeedEvent`s on one
// queue; each channel is stamped with the feed's generation at open time,
// and events from any other generation are stale and dropped.
//
// Renderers never touch the feed directly: history and channel state are
// published through watch channels.

mod connector;
mod handle;
mod history;
mod record;
mod state;
mod target;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use feeder_api::ChannelSignal;

use crate::stream::SnapshotStream;

pub use connector::{FeedEvent, GenerationSink, PushConnector, WebSocketConnector};
pub use handle::{FeedCommand, FeedHandle};
pub use history::VisitHistory;
pub use record::{VisitDecodeError, VisitEvent, VisitRecord};
pub use state::ChannelState;
pub use target::ConnectionTarget;

/// History length used when none is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// Published view of the history: newest first.
pub type HistorySnapshot = Arc<Vec<VisitRecord>>;

struct ActiveChannel<T> {
    cancel: CancellationToken,
    _channel: T,
}

/// Single-owner live feed for one device at a time.
pub struct LiveFeed<C: PushConnector = WebSocketConnector> {
    connector: C,
    generation: u64,
    next_seq: u64,
    target: Option<ConnectionTarget>,
    channel: Option<ActiveChannel<C::Channel>>,
    state: ChannelState,
    history: VisitHistory,
    state_tx: watch::Sender<ChannelState>,
    history_tx: watch::Sender<HistorySnapshot>,
    event_tx: mpsc::UnboundedSender<FeedEvent>,
    event_rx: mpsc::UnboundedReceiver<FeedEvent>,
}

impl LiveFeed<WebSocketConnector> {
    /// Feed backed by real WebSocket channels.
    pub fn websocket(capacity: usize) -> Self {
        Self::new(WebSocketConnector, capacity)
    }
}

impl<C: PushConnector> LiveFeed<C> {
    pub fn new(connector: C, capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Idle);
        let (history_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            connector,
            generation: 0,
            next_seq: 1,
            target: None,
            channel: None,
            state: ChannelState::Idle,
            history: VisitHistory::new(capacity),
            state_tx,
            history_tx,
            event_tx,
            event_rx,
        }
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn target(&self) -> Option<&ConnectionTarget> {
        self.target.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> &VisitHistory {
        &self.history
    }

    /// Current history snapshot.
    pub fn snapshot(&self) -> HistorySnapshot {
        self.history_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_history(&self) -> SnapshotStream<Vec<VisitRecord>> {
        SnapshotStream::new(self.history_tx.subscribe())
    }

    // ── Operations ───────────────────────────────────────────────

    /// Make `target` the live channel.
    ///
    /// A no-op when `target` is already the current target (whatever the
    /// channel's state). Otherwise the existing channel is torn down, the
    /// history cleared, and a new channel opened. Channel failures are
    /// reported through the state, never returned.
    pub fn connect(&mut self, target: ConnectionTarget) {
        if self.target.as_ref() == Some(&target) {
            debug!(channel = %target, state = %self.state, "already connected to target");
            return;
        }

        self.teardown();
        self.history.clear();
        self.publish_history();

        self.generation += 1;
        self.set_state(ChannelState::Idle);

        let url = match target.channel_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(channel = %target, error = %e, "cannot build push channel URL");
                self.target = Some(target);
                self.set_state(ChannelState::Failed);
                return;
            }
        };

        info!(%url, generation = self.generation, "opening visit channel");
        let cancel = CancellationToken::new();
        let sink = GenerationSink::new(self.generation, self.event_tx.clone());
        let channel = self.connector.open(url, cancel.clone(), sink);

        self.channel = Some(ActiveChannel {
            cancel,
            _channel: channel,
        });
        self.target = Some(target);
        self.set_state(ChannelState::Connecting);
    }

    /// Close the channel, if any. Idempotent.
    ///
    /// The history is kept until the next `connect`; events already queued
    /// from the old channel become stale.
    pub fn teardown(&mut self) {
        self.generation += 1;

        if let Some(active) = self.channel.take() {
            active.cancel.cancel();
        }

        if let Some(target) = self.target.take() {
            debug!(channel = %target, "visit channel torn down");
            self.set_state(ChannelState::Closed);
        }
    }

    /// Decode a raw payload and append it; malformed payloads are dropped.
    pub fn on_message(&mut self, raw: &str) {
        match VisitEvent::decode(raw) {
            Ok(record) => self.append_record(record),
            Err(e) => debug!(error = %e, payload = raw, "dropping visit payload"),
        }
    }

    /// Prepend a record, evicting the oldest when full.
    ///
    /// The record is stamped with the next sequence number; numbers keep
    /// increasing across target changes.
    pub fn append_record(&mut self, record: VisitRecord) {
        let record = record.with_seq(self.next_seq);
        self.next_seq += 1;
        trace!(record = %record, seq = record.seq(), "visit");
        self.history.push(record);
        self.publish_history();
    }

    // ── Event processing ─────────────────────────────────────────

    /// Apply one channel event. Stale events are ignored.
    pub fn handle_event(&mut self, event: FeedEvent) {
        if event.generation != self.generation {
            trace!(
                event_generation = event.generation,
                generation = self.generation,
                "ignoring stale channel event"
            );
            return;
        }

        match &event.signal {
            ChannelSignal::Opened => {
                info!(channel = ?self.target.as_ref().map(ToString::to_string), "visit channel open");
            }
            ChannelSignal::Message(raw) => {
                if self.state.accepts_messages() {
                    self.on_message(raw);
                }
            }
            ChannelSignal::Failed(reason) => {
                warn!(reason = %reason, "visit channel error");
            }
            ChannelSignal::Closed { code, reason } => {
                info!(?code, reason = %reason, "visit channel closed by server");
            }
        }

        let next = self.state.on_signal(&event.signal);
        self.set_state(next);
    }

    /// Wait for the next queued channel event.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.event_rx.recv().await
    }

    /// Apply every event already queued, returning how many were taken.
    pub fn pump(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    // ── Internals ────────────────────────────────────────────────

    fn set_state(&mut self, state: ChannelState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "visit channel state");
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn publish_history(&self) {
        self.history_tx.send_replace(Arc::new(self.history.snapshot()));
    }
}

impl<C: PushConnector> Drop for LiveFeed<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::connector::manual::ManualConnector;
    use super::*;

    use feeder_api::SignalSink;

    fn target(base: &str, device: &str) -> ConnectionTarget {
        ConnectionTarget::new(base.parse().expect("url"), device)
    }

    fn visit(bird: &str, at: &str) -> ChannelSignal {
        ChannelSignal::Message(format!(r#"{{"visiting_bird":"{bird}","visited_at":"{at}"}}"#))
    }

    fn feed() -> (LiveFeed<ManualConnector>, ManualConnector) {
        let connector = ManualConnector::default();
        (LiveFeed::new(connector.clone(), DEFAULT_HISTORY_CAPACITY), connector)
    }

    fn lines(feed: &LiveFeed<ManualConnector>) -> Vec<String> {
        feed.snapshot().iter().map(ToString::to_string).collect()
    }

    fn open(feed: &mut LiveFeed<ManualConnector>, connector: &ManualConnector) {
        connector.last().sink.send(ChannelSignal::Opened);
        feed.pump();
    }

    #[test]
    fn connect_opens_one_channel_at_device_url() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));

        assert_eq!(feed.state(), ChannelState::Connecting);
        let opened = connector.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].url.as_str(), "ws://h1/ws/dev1");
        assert_eq!(opened[0].sink.generation(), feed.generation());
    }

    #[test]
    fn same_target_is_a_noop() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);
        feed.connect(target("ws://h1/ws", "dev1"));

        assert_eq!(connector.opened().len(), 1);
        assert_eq!(feed.state(), ChannelState::Open);
        assert!(!connector.last().cancel.is_cancelled());
    }

    #[test]
    fn n_events_keep_last_five_newest_first() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);

        let sink = connector.last().sink;
        for n in 1..=7 {
            sink.send(visit(&format!("bird{n}"), &format!("t{n}")));
        }
        assert_eq!(feed.pump(), 7);

        assert_eq!(
            lines(&feed),
            [
                "bird7 visited at t7",
                "bird6 visited at t6",
                "bird5 visited at t5",
                "bird4 visited at t4",
                "bird3 visited at t3",
            ]
        );
    }

    #[test]
    fn malformed_payloads_leave_history_unchanged() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);

        let sink = connector.last().sink;
        sink.send(visit("Robin", "10:00"));
        sink.send(ChannelSignal::Message("not json".into()));
        sink.send(ChannelSignal::Message(r#"{"visited_at":"10:01"}"#.into()));
        sink.send(ChannelSignal::Message(r#"{"visiting_bird":"Wren"}"#.into()));
        feed.pump();

        assert_eq!(lines(&feed), ["Robin visited at 10:00"]);
        assert_eq!(feed.state(), ChannelState::Open);
    }

    #[test]
    fn target_change_clears_history_and_closes_old_channel() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);
        connector.last().sink.send(visit("Robin", "10:00"));
        feed.pump();
        assert_eq!(feed.history().len(), 1);

        feed.connect(target("ws://h1/ws", "dev2"));

        let opened = connector.opened();
        assert_eq!(opened.len(), 2);
        assert!(opened[0].cancel.is_cancelled());
        assert!(!opened[1].cancel.is_cancelled());
        assert!(feed.snapshot().is_empty());
        assert_eq!(feed.state(), ChannelState::Connecting);
    }

    #[test]
    fn stale_events_from_superseded_channel_are_ignored() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        let old_sink = connector.last().sink;
        old_sink.send(ChannelSignal::Opened);
        feed.pump();

        feed.connect(target("ws://h1/ws", "dev2"));
        let new_sink = connector.last().sink;

        // Late callbacks from dev1 after the switch
        old_sink.send(visit("Crow", "09:59"));
        old_sink.send(ChannelSignal::Failed("reset".into()));
        old_sink.send(ChannelSignal::Closed {
            code: Some(1000),
            reason: String::new(),
        });
        feed.pump();

        assert!(feed.snapshot().is_empty());
        assert_eq!(feed.state(), ChannelState::Connecting);

        new_sink.send(ChannelSignal::Opened);
        new_sink.send(visit("Robin", "10:00"));
        feed.pump();

        assert_eq!(lines(&feed), ["Robin visited at 10:00"]);
        assert_eq!(feed.state(), ChannelState::Open);
    }

    #[test]
    fn late_open_from_pending_channel_is_ignored() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        let old_sink = connector.last().sink;

        // dev1 never opened before the switch
        feed.connect(target("ws://h1/ws", "dev2"));
        old_sink.send(ChannelSignal::Opened);
        old_sink.send(visit("Crow", "09:59"));
        feed.pump();

        assert_eq!(feed.state(), ChannelState::Connecting);
        assert!(feed.snapshot().is_empty());
        assert!(connector.opened()[0].cancel.is_cancelled());
    }

    #[test]
    fn identical_visits_get_distinct_sequence_numbers() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);

        let sink = connector.last().sink;
        sink.send(visit("Robin", "10:00"));
        sink.send(visit("Robin", "10:00"));
        feed.pump();

        let snap = feed.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].as_str(), snap[1].as_str());
        assert_eq!((snap[0].seq(), snap[1].seq()), (2, 1));

        // Numbering continues on a new target
        feed.connect(target("ws://h1/ws", "dev2"));
        open(&mut feed, &connector);
        connector.last().sink.send(visit("Wren", "10:05"));
        feed.pump();
        assert_eq!(feed.snapshot()[0].seq(), 3);
    }

    #[test]
    fn error_before_open_fails_without_retry() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        connector.last().sink.send(ChannelSignal::Failed("refused".into()));
        feed.pump();

        assert_eq!(feed.state(), ChannelState::Failed);
        assert_eq!(connector.opened().len(), 1);

        // Failed channel for the same target stays as is
        feed.connect(target("ws://h1/ws", "dev1"));
        assert_eq!(connector.opened().len(), 1);
    }

    #[test]
    fn server_close_is_terminal_for_target() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);

        let sink = connector.last().sink;
        sink.send(ChannelSignal::Closed {
            code: Some(1001),
            reason: "going away".into(),
        });
        sink.send(visit("Robin", "10:00"));
        feed.pump();

        assert_eq!(feed.state(), ChannelState::Closed);
        assert!(feed.snapshot().is_empty());
    }

    #[test]
    fn teardown_is_idempotent_and_keeps_history() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);
        connector.last().sink.send(visit("Robin", "10:00"));
        feed.pump();

        feed.teardown();
        feed.teardown();

        assert_eq!(feed.state(), ChannelState::Closed);
        assert!(connector.last().cancel.is_cancelled());
        assert!(feed.target().is_none());
        assert_eq!(feed.history().len(), 1);

        // Queued messages from the torn-down channel no longer apply
        connector.last().sink.send(visit("Wren", "10:01"));
        feed.pump();
        assert_eq!(feed.history().len(), 1);
    }

    #[test]
    fn reconnect_after_teardown_starts_fresh() {
        let (mut feed, connector) = feed();
        let t = target("ws://h1/ws", "dev1");
        feed.connect(t.clone());
        open(&mut feed, &connector);
        connector.last().sink.send(visit("Robin", "10:00"));
        feed.pump();

        feed.teardown();
        feed.connect(t);

        assert_eq!(connector.opened().len(), 2);
        assert!(feed.snapshot().is_empty());
        assert_eq!(feed.state(), ChannelState::Connecting);
    }

    #[test]
    fn drop_closes_channel() {
        let (mut feed, connector) = feed();
        feed.connect(target("ws://h1/ws", "dev1"));
        drop(feed);
        assert!(connector.last().cancel.is_cancelled());
    }

    #[tokio::test]
    async fn subscribers_see_history_snapshots() {
        let (mut feed, connector) = feed();
        let mut history = feed.subscribe_history();
        let state = feed.subscribe_state();

        feed.connect(target("ws://h1/ws", "dev1"));
        open(&mut feed, &connector);
        connector.last().sink.send(visit("Robin", "10:00"));

        let event = feed.next_event().await.expect("queued event");
        feed.handle_event(event);

        let snap = history.changed().await.expect("sender alive");
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].as_str(), "Robin visited at 10:00");
        assert_eq!(*state.borrow(), ChannelState::Open);
    }
}
