// ── Feed actor ──
//
// Moves a `LiveFeed` onto a background task so async callers can drive it
// without owning it. Commands and channel events are interleaved on that
// one task, which keeps every history mutation serialized.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CoreError;
use crate::stream::SnapshotStream;

use super::connector::{FeedEvent, PushConnector};
use super::record::VisitRecord;
use super::state::ChannelState;
use super::target::ConnectionTarget;
use super::LiveFeed;

const COMMAND_CHANNEL_SIZE: usize = 16;

/// Requests accepted by the feed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Connect(ConnectionTarget),
    Teardown,
}

/// Cloneable handle to a feed running on its own task.
#[derive(Clone)]
pub struct FeedHandle {
    command_tx: mpsc::Sender<FeedCommand>,
    state_rx: watch::Receiver<ChannelState>,
    history: SnapshotStream<Vec<VisitRecord>>,
    cancel: CancellationToken,
}

impl FeedHandle {
    /// Spawn `feed` onto the runtime. The task ends (tearing the feed down)
    /// when `cancel` fires or every handle is dropped.
    pub fn spawn<C: PushConnector>(
        feed: LiveFeed<C>,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let state_rx = feed.subscribe_state();
        let history = feed.subscribe_history();

        let task = tokio::spawn(feed_task(feed, command_rx, cancel.clone()));

        (
            Self {
                command_tx,
                state_rx,
                history,
                cancel,
            },
            task,
        )
    }

    /// Switch the feed to `target`. See [`LiveFeed::connect`].
    pub async fn connect(&self, target: ConnectionTarget) -> Result<(), CoreError> {
        self.send(FeedCommand::Connect(target)).await
    }

    /// Close the current channel. See [`LiveFeed::teardown`].
    pub async fn teardown(&self) -> Result<(), CoreError> {
        self.send(FeedCommand::Teardown).await
    }

    /// Stop the feed task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    pub fn history(&self) -> SnapshotStream<Vec<VisitRecord>> {
        self.history.clone()
    }

    async fn send(&self, command: FeedCommand) -> Result<(), CoreError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| CoreError::Internal("visit feed task has stopped".into()))
    }
}

enum Step {
    Stop,
    Command(FeedCommand),
    Event(FeedEvent),
}

async fn feed_task<C: PushConnector>(
    mut feed: LiveFeed<C>,
    mut command_rx: mpsc::Receiver<FeedCommand>,
    cancel: CancellationToken,
) {
    loop {
        let step = tokio::select! {
            biased;
            () = cancel.cancelled() => Step::Stop,
            command = command_rx.recv() => command.map_or(Step::Stop, Step::Command),
            Some(event) = feed.next_event() => Step::Event(event),
        };

        match step {
            Step::Stop => break,
            Step::Command(FeedCommand::Connect(target)) => feed.connect(target),
            Step::Command(FeedCommand::Teardown) => feed.teardown(),
            Step::Event(event) => feed.handle_event(event),
        }
    }

    feed.teardown();
    debug!("visit feed task exiting");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use feeder_api::{ChannelSignal, SignalSink};

    use super::super::connector::manual::ManualConnector;
    use super::*;

    fn target(device: &str) -> ConnectionTarget {
        ConnectionTarget::new("ws://h1/ws".parse().expect("url"), device)
    }

    async fn wait_for_state(rx: &mut watch::Receiver<ChannelState>, want: ChannelState) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
            .await
            .expect("timed out waiting for state")
            .expect("feed task alive");
    }

    #[tokio::test]
    async fn commands_and_events_flow_through_task() {
        let connector = ManualConnector::default();
        let feed = LiveFeed::new(connector.clone(), 5);
        let (handle, task) = FeedHandle::spawn(feed, CancellationToken::new());
        let mut state = handle.state();
        let mut history = handle.history();

        handle.connect(target("dev1")).await.expect("connect");
        wait_for_state(&mut state, ChannelState::Connecting).await;

        let sink = connector.last().sink;
        sink.send(ChannelSignal::Opened);
        wait_for_state(&mut state, ChannelState::Open).await;

        sink.send(ChannelSignal::Message(
            r#"{"visiting_bird":"Robin","visited_at":"10:00"}"#.into(),
        ));
        let snap = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snap = history.changed().await.expect("sender alive");
                if !snap.is_empty() {
                    break snap;
                }
            }
        })
        .await
        .expect("history update");
        assert_eq!(snap[0].as_str(), "Robin visited at 10:00");

        handle.teardown().await.expect("teardown");
        wait_for_state(&mut state, ChannelState::Closed).await;
        assert!(connector.last().cancel.is_cancelled());

        handle.shutdown();
        task.await.expect("task joins");
    }

    #[tokio::test]
    async fn shutdown_tears_down_channel() {
        let connector = ManualConnector::default();
        let feed = LiveFeed::new(connector.clone(), 5);
        let (handle, task) = FeedHandle::spawn(feed, CancellationToken::new());
        let mut state = handle.state();

        handle.connect(target("dev1")).await.expect("connect");
        wait_for_state(&mut state, ChannelState::Connecting).await;

        handle.shutdown();
        task.await.expect("task joins");

        assert!(connector.last().cancel.is_cancelled());
        assert!(handle.connect(target("dev2")).await.is_err());
    }
}
