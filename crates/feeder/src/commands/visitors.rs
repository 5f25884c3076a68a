//! Unwelcome visitor command handlers.

use tabled::Tabled;

use feeder_core::{Feeder, FeederConfig, VisitorToggle};

use crate::cli::{GlobalOpts, VisitorsArgs, VisitorsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct VisitorRow {
    #[tabled(rename = "Visitor")]
    name: String,
    #[tabled(rename = "Scare off")]
    enabled: String,
}

impl From<&VisitorToggle> for VisitorRow {
    fn from(v: &VisitorToggle) -> Self {
        Self {
            name: v.name.clone(),
            enabled: if v.enabled { "on" } else { "off" }.into(),
        }
    }
}

fn plain(v: &VisitorToggle) -> String {
    format!("{} {}", v.name, if v.enabled { "on" } else { "off" })
}

fn print_toggles(toggles: &[VisitorToggle], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(&global.output, toggles, |v| VisitorRow::from(v), plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: FeederConfig,
    args: VisitorsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        VisitorsCommand::List => {
            let toggles = Feeder::oneshot(config, |feeder| async move {
                feeder.refresh_unwelcome().await
            })
            .await?;
            print_toggles(&toggles, global)
        }

        VisitorsCommand::Toggle { name } => {
            let toggles = Feeder::oneshot(config, |feeder| async move {
                // Start from what the device has, not the local defaults
                feeder.refresh_unwelcome().await?;
                feeder.toggle_unwelcome(&name).await?;
                Ok(feeder.unwelcome_visitors().await)
            })
            .await?;
            util::status(global, "✓ Unwelcome visitors updated");
            print_toggles(&toggles, global)
        }

        VisitorsCommand::Set { names } => {
            let toggles = Feeder::oneshot(config, |feeder| async move {
                feeder.refresh_unwelcome().await?;
                feeder.set_unwelcome(&names).await?;
                Ok(feeder.unwelcome_visitors().await)
            })
            .await?;
            util::status(global, "✓ Unwelcome visitors updated");
            print_toggles(&toggles, global)
        }
    }
}
