use crate::cli::{actions::friendly, globals::GlobalArgs};
use anyhow::{bail, Result};

#[derive(Debug)]
pub enum Command {
    Refresh,
    Whoami,
    Logout { global: bool },
    Health,
}

/// Handle session actions
/// # Errors
/// Returns the user-facing message of the failed call.
pub async fn execute(globals: &GlobalArgs, command: Command) -> Result<()> {
    let client = globals.client()?;
    let session = client.session();

    match command {
        Command::Refresh => {
            if !session.is_authenticated() {
                bail!("Not signed in.");
            }
            client.refresh_tokens().await.map_err(friendly)?;
            println!("Access token refreshed.");
        }
        Command::Whoami => match session.user() {
            Some(user) if session.is_authenticated() => {
                let email = if user.email.is_empty() {
                    String::new()
                } else {
                    format!(" <{}>", user.email)
                };
                let provider = user
                    .provider
                    .as_deref()
                    .map(|provider| format!(" via {provider}"))
                    .unwrap_or_default();
                println!("{}{email}{provider}", user.display_name());
            }
            _ => println!("Not signed in."),
        },
        Command::Logout { global } => {
            if global {
                session.logout_global(&client).await;
            } else {
                session.logout_local();
            }
            println!("Signed out.");
        }
        Command::Health => {
            let status = client.health().await.map_err(friendly)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
