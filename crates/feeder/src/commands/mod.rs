//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod config_cmd;
pub mod feed;
pub mod food;
pub mod login;
pub mod species;
pub mod util;
pub mod visitors;

use feeder_core::FeederConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: FeederConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login => login::handle(config, global).await,
        Command::Food(args) => food::handle(config, args, global).await,
        Command::Species(args) => species::handle(config, args, global).await,
        Command::Visitors(args) => visitors::handle(config, args, global).await,
        Command::Feed(args) => feed::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
