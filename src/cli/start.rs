use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;

/// Parse arguments, initialize logging and resolve the action to run.
///
/// # Errors
/// Returns an error if logging cannot be initialized or the arguments are invalid.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_one::<u8>("verbosity").copied().unwrap_or(0);
    telemetry::init(Some(telemetry::level_from_verbosity(verbosity)))?;

    handler(&matches)
}
