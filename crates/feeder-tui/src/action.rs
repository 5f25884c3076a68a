//! UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use feeder_core::{ChannelState, FoodLevel, SpeciesCount, VisitRecord, VisitorToggle};

use crate::screen::ScreenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    ToggleHelp,

    // ── Data Events (from feeder-core streams) ────────────────────
    FoodLevelUpdated(FoodLevel),
    FoodAlertChanged(bool),
    HistoryUpdated(Arc<Vec<VisitRecord>>),
    FeedStateChanged(ChannelState),
    SpeciesUpdated(Arc<Vec<SpeciesCount>>),
    VisitorsUpdated(Arc<Vec<VisitorToggle>>),

    // ── Connection Status ─────────────────────────────────────────
    /// Logged in; carries the device name.
    Connected(String),
    Disconnected(String),

    // ── Commands ──────────────────────────────────────────────────
    DismissFoodAlert,
    RefreshSpecies,
    ToggleVisitor(String),

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
}
