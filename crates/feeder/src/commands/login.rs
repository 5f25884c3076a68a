//! Login: verify credentials and show which feeder the account resolves to.

use feeder_core::{CoreError, Feeder, FeederConfig, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(session: &Session) -> String {
    let device = session.device();
    format!(
        "User:    {}\nDevice:  {} (id {})",
        session.username(),
        device.device_name,
        device.id
    )
}

pub async fn handle(config: FeederConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner("Logging in...", global);
    let session = Feeder::oneshot(config, |feeder| async move {
        feeder.session().ok_or(CoreError::NotLoggedIn)
    })
    .await;
    spinner.finish_and_clear();

    let session = session?;
    let out = output::render_single(&global.output, session.as_ref(), detail, |s| {
        s.device_id().to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
