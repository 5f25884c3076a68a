//! Visit push channel.
//!
//! One WebSocket connection per [`PushChannel`], reported to the owner as a
//! sequence of [`ChannelSignal`]s through a [`SignalSink`]. There is no
//! reconnection here: a channel that fails or closes stays down, and the
//! owner decides whether to open another one.
//!
//! # Example
//!
//! ```rust,ignore
//! use feeder_api::websocket::{ChannelSignal, PushChannel};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! let (tx, mut rx) = mpsc::unbounded_channel::<ChannelSignal>();
//! let url = url::Url::parse("ws://localhost:8000/ws/feeder-1")?;
//! let channel = PushChannel::spawn(url, CancellationToken::new(), tx);
//!
//! while let Some(signal) = rx.recv().await {
//!     println!("{signal:?}");
//! }
//! channel.close();
//! ```

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, protocol::CloseFrame};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Signals ──────────────────────────────────────────────────────────

/// Lifecycle and payload notifications from one push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// The WebSocket handshake completed.
    Opened,
    /// A text payload (or UTF-8 binary payload) arrived.
    Message(String),
    /// The connection could not be established or broke while open.
    Failed(String),
    /// The server closed the connection or the stream ended.
    Closed { code: Option<u16>, reason: String },
}

/// Receiver side of a push channel's signals.
///
/// Implementations must not block; the reader task calls `send` inline
/// and holds a shared reference across awaits.
pub trait SignalSink: Send + Sync + 'static {
    fn send(&self, signal: ChannelSignal);
}

impl SignalSink for mpsc::UnboundedSender<ChannelSignal> {
    fn send(&self, signal: ChannelSignal) {
        // Receiver gone means nobody is listening anymore
        let _ = mpsc::UnboundedSender::send(self, signal);
    }
}

// ── PushChannel ──────────────────────────────────────────────────────

/// Handle to a running push-channel task.
///
/// Closing (or dropping) the handle cancels the task, which sends a close
/// frame if connected and then exits without emitting further signals.
pub struct PushChannel {
    url: Url,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PushChannel {
    /// Spawn the connection task.
    ///
    /// Returns immediately; the handshake happens asynchronously and is
    /// reported as [`ChannelSignal::Opened`] or [`ChannelSignal::Failed`].
    /// The task also stops when `cancel` (or a parent of it) is cancelled.
    pub fn spawn(url: Url, cancel: CancellationToken, sink: impl SignalSink) -> Self {
        let task_url = url.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            run_channel(&task_url, &task_cancel, &sink).await;
            tracing::debug!(url = %task_url, "push channel task exiting");
        });

        Self { url, cancel, task }
    }

    /// The endpoint this channel connects to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request shutdown. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether the background task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn run_channel(url: &Url, cancel: &CancellationToken, sink: &impl SignalSink) {
    tracing::info!(url = %url, "connecting push channel");

    let connect = tokio_tungstenite::connect_async(url.as_str());
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = connect => result,
    };

    let mut ws_stream = match result {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let err = Error::WebSocketConnect(e.to_string());
            sink.send(ChannelSignal::Failed(err.to_string()));
            return;
        }
    };

    tracing::info!(url = %url, "push channel open");
    sink.send(ChannelSignal::Opened);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = ws_stream.close(None).await {
                    tracing::debug!(error = %e, "close frame not delivered");
                }
                return;
            }
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        sink.send(ChannelSignal::Message(text.to_string()));
                    }
                    Some(Ok(tungstenite::Message::Binary(bytes))) => {
                        match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => sink.send(ChannelSignal::Message(text)),
                            Err(_) => tracing::debug!(len = bytes.len(), "ignoring non-UTF-8 binary frame"),
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        sink.send(closed_signal(frame));
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        sink.send(ChannelSignal::Failed(e.to_string()));
                        return;
                    }
                    None => {
                        sink.send(ChannelSignal::Closed {
                            code: None,
                            reason: "stream ended".into(),
                        });
                        return;
                    }
                }
            }
        }
    }
}

fn closed_signal(frame: Option<CloseFrame>) -> ChannelSignal {
    match frame {
        Some(cf) => ChannelSignal::Closed {
            code: Some(u16::from(cf.code)),
            reason: cf.reason.to_string(),
        },
        None => ChannelSignal::Closed {
            code: None,
            reason: String::new(),
        },
    }
}

// ── Tests ────────────────────────────────────────────────────────────
