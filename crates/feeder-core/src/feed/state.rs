// ── Push-channel state machine ──

use serde::Serialize;
use strum::{Display, EnumString};

use feeder_api::ChannelSignal;

/// Lifecycle of the channel for the current target.
///
/// `Closed` is terminal for a target; a new target restarts at `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Idle,
    Connecting,
    Open,
    Failed,
    Closed,
}

impl ChannelState {
    /// State after applying a signal from the current channel.
    ///
    /// Signals that make no sense in the current state leave it unchanged.
    pub fn on_signal(self, signal: &ChannelSignal) -> Self {
        match (self, signal) {
            (Self::Connecting, ChannelSignal::Opened) => Self::Open,
            (Self::Connecting | Self::Open, ChannelSignal::Failed(_)) => Self::Failed,
            (Self::Connecting | Self::Open, ChannelSignal::Closed { .. }) => Self::Closed,
            (state, _) => state,
        }
    }

    /// Whether inbound messages should be applied.
    pub fn accepts_messages(self) -> bool {
        self == Self::Open
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}
