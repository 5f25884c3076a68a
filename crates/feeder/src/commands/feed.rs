//! Live visit feed command handlers.

use feeder_core::{ChannelState, Feeder, FeederConfig, VisitRecord};
use tracing::debug;

use crate::cli::{FeedArgs, FeedCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

/// Records in `snapshot` numbered after `last_seen`, oldest first.
///
/// Snapshots are most-recent-first and may skip intermediate states when
/// several visits arrive between two reads.
fn fresh_records(snapshot: &[VisitRecord], last_seen: u64) -> impl Iterator<Item = &VisitRecord> {
    let end = snapshot
        .iter()
        .position(|r| r.seq() <= last_seen)
        .unwrap_or(snapshot.len());
    snapshot[..end].iter().rev()
}

fn print_record(record: &VisitRecord, global: &GlobalOpts) -> Result<(), CliError> {
    // One line per record so the stream stays line-delimited
    let format = match global.output {
        OutputFormat::Json => &OutputFormat::JsonCompact,
        ref other => other,
    };
    let out = output::render_single(
        format,
        record,
        |r| r.as_str().to_owned(),
        |r| r.as_str().to_owned(),
    )?;
    output::print_output(out.trim_end(), global.quiet);
    Ok(())
}

pub async fn handle(
    config: FeederConfig,
    args: FeedArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FeedCommand::Watch { device } => watch(config, device, global).await,
    }
}

async fn watch(
    config: FeederConfig,
    device: Option<String>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let feeder = Feeder::new(config)?;
    let session = feeder.authenticate().await?;
    let device = device.unwrap_or_else(|| session.device_id().to_owned());

    let mut history = feeder.visit_history();
    let mut state = feeder.feed_state();
    feeder.watch_device(&device).await?;
    util::status(
        global,
        &output::muted(
            &format!("Watching visits on {device} (Ctrl-C to stop)"),
            output::should_color(&global.color),
        ),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_seen = 0;

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),

            snapshot = history.changed() => {
                let Some(snapshot) = snapshot else { break Ok(()) };
                let mut failed = None;
                for record in fresh_records(&snapshot, last_seen) {
                    if let Err(e) = print_record(record, global) {
                        failed = Some(e);
                        break;
                    }
                }
                if let Some(e) = failed {
                    break Err(e);
                }
                last_seen = snapshot.first().map_or(last_seen, VisitRecord::seq);
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                debug!(state = %current, "visit channel state");
                match current {
                    ChannelState::Failed => break Err(CliError::ChannelFailed),
                    ChannelState::Closed => {
                        util::status(global, "Visit channel closed by the server");
                        break Ok(());
                    }
                    ChannelState::Idle | ChannelState::Connecting | ChannelState::Open => {}
                }
            }
        }
    };

    feeder.disconnect().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64, species: &str, at: &str) -> VisitRecord {
        VisitRecord::new(species, at).with_seq(seq)
    }

    fn texts<'a>(records: impl Iterator<Item = &'a VisitRecord>) -> Vec<&'a str> {
        records.map(VisitRecord::as_str).collect()
    }

    #[test]
    fn first_snapshot_prints_everything_oldest_first() {
        let snapshot = vec![record(2, "Wren", "2"), record(1, "Robin", "1")];
        assert_eq!(
            texts(fresh_records(&snapshot, 0)),
            vec!["Robin visited at 1", "Wren visited at 2"]
        );
    }

    #[test]
    fn only_records_newer_than_last_seen_are_printed() {
        let snapshot = vec![
            record(3, "Jay", "3"),
            record(2, "Wren", "2"),
            record(1, "Robin", "1"),
        ];
        assert_eq!(
            texts(fresh_records(&snapshot, 1)),
            vec!["Wren visited at 2", "Jay visited at 3"]
        );
        assert_eq!(fresh_records(&snapshot, 3).count(), 0);
    }

    #[test]
    fn evicted_last_seen_prints_whole_snapshot() {
        let snapshot = vec![record(7, "Jay", "3"), record(6, "Wren", "2")];
        assert_eq!(fresh_records(&snapshot, 4).count(), 2);
    }

    #[test]
    fn repeated_identical_visit_is_printed() {
        let snapshot = vec![record(2, "Robin", "10:00"), record(1, "Robin", "10:00")];
        assert_eq!(
            texts(fresh_records(&snapshot, 1)),
            vec!["Robin visited at 10:00"]
        );
    }
}
