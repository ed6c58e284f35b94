pub mod account;
pub mod google;
pub mod session;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Account(GlobalArgs, account::Command),
    Session(GlobalArgs, session::Command),
    Google(GlobalArgs, google::Command),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

/// Turns a library error into the one-line message shown to the user.
pub(crate) fn friendly(err: crate::Error) -> anyhow::Error {
    tracing::debug!("{err}");
    anyhow::anyhow!(err.user_message())
}
