use crate::cli::{
    actions::{account, google, session, Action},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Account(globals, command) => account::execute(&globals, command).await,
        Action::Session(globals, command) => session::execute(&globals, command).await,
        Action::Google(globals, command) => google::execute(&globals, command).await,
    };

    telemetry::shutdown_tracer();
    result
}
