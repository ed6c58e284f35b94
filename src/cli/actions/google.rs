use crate::{
    cli::globals::GlobalArgs,
    oauth::{CallbackParams, GoogleHandoff, HandoffState},
};
use anyhow::{anyhow, bail, Result};

#[derive(Debug)]
pub enum Command {
    Begin,
    Callback { url: String },
}

/// Handle the Google redirect handoff
/// # Errors
/// Returns an error if the URL cannot be obtained or the callback fails.
pub async fn execute(globals: &GlobalArgs, command: Command) -> Result<()> {
    let mut handoff = GoogleHandoff::new(globals.client()?);

    match command {
        Command::Begin => {
            let url = handoff
                .begin()
                .await
                .map_err(|err| anyhow!("Google authentication failed: {}", err.user_message()))?;
            println!("Open this URL in your browser to continue:\n{url}");
        }
        Command::Callback { url } => {
            let params = CallbackParams::parse(&url).map_err(|err| anyhow!(err.user_message()))?;

            match handoff.complete(params).await {
                HandoffState::Authenticated(user) => {
                    println!("Signed in with Google as {}.", user.display_name());
                }
                HandoffState::Failed { reason, navigation } => {
                    eprintln!("{reason}");
                    eprintln!(
                        "Returning to {} in {} seconds...",
                        navigation.to,
                        navigation.after.as_secs()
                    );
                    navigation.wait().await;
                    bail!("{reason}");
                }
                state => bail!("Google sign-in did not finish (state: {state:?})"),
            }
        }
    }

    Ok(())
}
