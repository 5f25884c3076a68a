// ── Food level monitoring ──
//
// The feeder reports its hopper level as a fraction. The dashboard shows it
// as a whole percentage and raises a one-shot alert when it runs low.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::CoreError;

/// Level reported when a poll fails, so a flaky backend never looks empty.
pub const FALLBACK_FOOD_LEVEL: f64 = 1.0;

/// Hopper fill level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FoodLevel {
    fraction: f64,
}

impl FoodLevel {
    pub const FULL: Self = Self { fraction: 1.0 };

    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }

    /// Raw fraction as reported (normally `0.0..=1.0`).
    pub fn fraction(self) -> f64 {
        self.fraction
    }

    /// Whole percent, truncated toward zero and clamped to `0..=100`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    pub fn percent(self) -> u8 {
        if !self.fraction.is_finite() {
            return 0;
        }
        (self.fraction * 100.0).trunc().clamp(0.0, 100.0) as u8
    }

    pub fn is_below(self, threshold: f64) -> bool {
        self.fraction < threshold
    }
}

impl Default for FoodLevel {
    fn default() -> Self {
        Self::FULL
    }
}

impl std::fmt::Display for FoodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// What a new reading did to the low-food alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertChange {
    Raised,
    Cleared,
    Unchanged,
}

/// Latch for the low-food alert: raised once on the way down, cleared on
/// recovery, never re-raised while the level stays low.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoodAlert {
    raised: bool,
}

impl FoodAlert {
    pub fn is_raised(self) -> bool {
        self.raised
    }

    pub fn update(&mut self, level: FoodLevel, threshold: f64) -> AlertChange {
        match (level.is_below(threshold), self.raised) {
            (true, false) => {
                self.raised = true;
                AlertChange::Raised
            }
            (false, true) => {
                self.raised = false;
                AlertChange::Cleared
            }
            _ => AlertChange::Unchanged,
        }
    }
}

/// Turns poll results into levels and alert transitions.
#[derive(Debug, Clone)]
pub struct FoodMonitor {
    threshold: f64,
    alert: FoodAlert,
}

impl FoodMonitor {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            alert: FoodAlert::default(),
        }
    }

    pub fn alert(&self) -> FoodAlert {
        self.alert
    }

    /// Apply one poll result. A failed poll reads as [`FALLBACK_FOOD_LEVEL`].
    pub fn observe(&mut self, result: Result<f64, CoreError>) -> (FoodLevel, AlertChange) {
        let level = match result {
            Ok(fraction) => FoodLevel::new(fraction),
            Err(e) => {
                warn!(error = %e, "food level poll failed, assuming full");
                FoodLevel::new(FALLBACK_FOOD_LEVEL)
            }
        };

        let change = self.alert.update(level, self.threshold);
        match change {
            AlertChange::Raised => warn!(level = %level, "food level is low"),
            AlertChange::Cleared => info!(level = %level, "food level recovered"),
            AlertChange::Unchanged => {}
        }
        (level, change)
    }
}
