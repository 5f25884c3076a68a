//! Species leaderboard command handler.

use serde::Serialize;
use tabled::Tabled;

use feeder_core::{Feeder, FeederConfig, SpeciesCount};

use crate::cli::{GlobalOpts, SpeciesArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RankedSpecies {
    rank: usize,
    common_name: String,
    num_visits: u64,
}

#[derive(Tabled)]
struct SpeciesRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Species")]
    species: String,
    #[tabled(rename = "Visits")]
    visits: u64,
}

impl From<&RankedSpecies> for SpeciesRow {
    fn from(s: &RankedSpecies) -> Self {
        Self {
            rank: s.rank,
            species: s.common_name.clone(),
            visits: s.num_visits,
        }
    }
}

fn rank(board: &[SpeciesCount]) -> Vec<RankedSpecies> {
    board
        .iter()
        .enumerate()
        .map(|(i, s)| RankedSpecies {
            rank: i + 1,
            common_name: s.common_name.clone(),
            num_visits: s.num_visits,
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: FeederConfig,
    args: SpeciesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let board = Feeder::oneshot(config, |feeder| async move {
        feeder.top_species(args.limit).await
    })
    .await?;

    if board.is_empty() && !global.quiet {
        eprintln!("No visits recorded yet");
    }

    let ranked = rank(&board);
    let out = output::render_list(&global.output, &ranked, |s| SpeciesRow::from(s), |s| {
        s.common_name.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_start_at_one_in_board_order() {
        let board = vec![
            SpeciesCount {
                common_name: "Robin".into(),
                num_visits: 9,
            },
            SpeciesCount {
                common_name: "Wren".into(),
                num_visits: 3,
            },
        ];
        let ranked = rank(&board);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[1].common_name, "Wren");
    }
}
