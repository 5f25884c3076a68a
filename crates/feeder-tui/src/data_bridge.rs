//! Data bridge: forwards [`Feeder`] watch channels to TUI actions.
//!
//! Runs as a background task. Logs in, pushes the current snapshot of
//! every stream so screens render immediately, then forwards each change
//! as an [`Action`] until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use feeder_core::{ConnectionState, Feeder};

use crate::action::Action;

pub async fn spawn_data_bridge(
    feeder: Feeder,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    // Subscribe before connecting so nothing published during login is lost
    let mut food_level = feeder.food_level();
    let mut food_alert = feeder.food_alert();
    let mut history = feeder.visit_history();
    let mut feed_state = feeder.feed_state();
    let mut species = feeder.species();
    let mut visitors = feeder.unwelcome_stream();
    let mut conn_state = feeder.connection_state();

    let connected = tokio::select! {
        () = cancel.cancelled() => return,
        result = feeder.connect() => result,
    };
    if let Err(e) = connected {
        warn!(error = %e, "failed to connect to feeder backend");
        let _ = action_tx.send(Action::Disconnected(e.to_string()));
        return;
    }

    let device = feeder
        .session()
        .map(|s| s.device().device_name.clone())
        .unwrap_or_default();
    let _ = action_tx.send(Action::Connected(device));

    let _ = action_tx.send(Action::FoodLevelUpdated(*food_level.borrow_and_update()));
    let _ = action_tx.send(Action::FoodAlertChanged(*food_alert.borrow_and_update()));
    let _ = action_tx.send(Action::HistoryUpdated(history.latest()));
    let _ = action_tx.send(Action::FeedStateChanged(*feed_state.borrow_and_update()));
    let _ = action_tx.send(Action::SpeciesUpdated(species.latest()));
    let _ = action_tx.send(Action::VisitorsUpdated(visitors.latest()));
    conn_state.mark_unchanged();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(records) = history.changed() => {
                debug!(len = records.len(), "dispatching HistoryUpdated");
                let _ = action_tx.send(Action::HistoryUpdated(records));
            }
            Ok(()) = feed_state.changed() => {
                let state = *feed_state.borrow_and_update();
                let _ = action_tx.send(Action::FeedStateChanged(state));
            }
            Ok(()) = food_level.changed() => {
                let level = *food_level.borrow_and_update();
                let _ = action_tx.send(Action::FoodLevelUpdated(level));
            }
            Ok(()) = food_alert.changed() => {
                let raised = *food_alert.borrow_and_update();
                let _ = action_tx.send(Action::FoodAlertChanged(raised));
            }
            Some(board) = species.changed() => {
                let _ = action_tx.send(Action::SpeciesUpdated(board));
            }
            Some(toggles) = visitors.changed() => {
                let _ = action_tx.send(Action::VisitorsUpdated(toggles));
            }
            Ok(()) = conn_state.changed() => {
                let state = *conn_state.borrow_and_update();
                match state {
                    ConnectionState::Disconnected => {
                        let _ = action_tx.send(Action::Disconnected("disconnected".into()));
                    }
                    ConnectionState::Failed => {
                        let _ = action_tx.send(Action::Disconnected("connection failed".into()));
                    }
                    ConnectionState::Connecting | ConnectionState::Connected => {}
                }
            }
        }
    }

    feeder.disconnect().await;
    debug!("data bridge shut down");
}
