// ── Channel factory seam ──
//
// The feed never talks to tokio-tungstenite directly; it asks a
// `PushConnector` to open a channel and hands it a sink stamped with the
// generation that channel belongs to. Tests substitute a connector that
// records sinks so they can replay signals by hand.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use feeder_api::{ChannelSignal, PushChannel, SignalSink};

/// A channel signal tagged with the generation of the channel that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub generation: u64,
    pub signal: ChannelSignal,
}

/// Forwards a channel's signals onto the feed's event queue.
#[derive(Debug, Clone)]
pub struct GenerationSink {
    generation: u64,
    tx: mpsc::UnboundedSender<FeedEvent>,
}

impl GenerationSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<FeedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl SignalSink for GenerationSink {
    fn send(&self, signal: ChannelSignal) {
        // Feed dropped: the channel is being torn down anyway
        let _ = self.tx.send(FeedEvent {
            generation: self.generation,
            signal,
        });
    }
}

/// Opens push channels on behalf of a feed.
pub trait PushConnector: Send + 'static {
    /// Keeps the channel alive; dropping it must close the channel.
    type Channel: Send + 'static;

    fn open(&self, url: Url, cancel: CancellationToken, sink: GenerationSink) -> Self::Channel;
}

/// Production connector backed by a WebSocket [`PushChannel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl PushConnector for WebSocketConnector {
    type Channel = PushChannel;

    fn open(&self, url: Url, cancel: CancellationToken, sink: GenerationSink) -> PushChannel {
        PushChannel::spawn(url, cancel, sink)
    }
}

#[cfg(test)]
pub(crate) mod manual {
    use std::sync::{Arc, Mutex, PoisonError};

    use super::*;

    /// One channel the feed asked for.
    #[derive(Debug, Clone)]
    pub(crate) struct Opened {
        pub url: Url,
        pub cancel: CancellationToken,
        pub sink: GenerationSink,
    }

    /// Connector that opens nothing and records every request.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ManualConnector {
        opened: Arc<Mutex<Vec<Opened>>>,
    }

    impl ManualConnector {
        pub(crate) fn opened(&self) -> Vec<Opened> {
            self.opened
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub(crate) fn last(&self) -> Opened {
            self.opened().pop().expect("no channel opened")
        }
    }

    impl PushConnector for ManualConnector {
        type Channel = ();

        fn open(&self, url: Url, cancel: CancellationToken, sink: GenerationSink) {
            self.opened
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Opened { url, cancel, sink });
        }
    }
}
