use crate::{
    cli::{actions::friendly, globals::GlobalArgs},
    client::{Credentials, ResetPasswordRequest, SignupProfile},
};
use anyhow::{Context, Result};

#[derive(Debug)]
pub enum Command {
    Signup(SignupProfile),
    Verify { email: Option<String>, code: String },
    CancelVerification,
    Signin(Credentials),
    Forgot { email: String },
    Reset(ResetPasswordRequest),
}

/// Handle account actions
/// # Errors
/// Returns the user-facing message of the failed call.
pub async fn execute(globals: &GlobalArgs, command: Command) -> Result<()> {
    let client = globals.client()?;

    match command {
        Command::Signup(profile) => {
            let ack = client.signup(&profile).await.map_err(friendly)?;
            println!(
                "{}",
                ack.message.unwrap_or_else(|| format!(
                    "Account created. Enter the code sent to {} with `authfront verify --code <CODE>`.",
                    profile.email.trim()
                ))
            );
        }
        Command::Verify { email, code } => {
            let email = match email {
                Some(email) => email,
                None => client
                    .session()
                    .pending_verification()
                    .map(|pending| pending.email)
                    .context("No pending verification; pass --email")?,
            };

            let response = client.verify_email(&email, &code).await.map_err(friendly)?;
            println!(
                "{}",
                response
                    .message
                    .unwrap_or_else(|| "Email verified. You can now sign in.".to_string())
            );
        }
        Command::CancelVerification => {
            client.session().cancel_verification();
            println!("Pending verification cleared.");
        }
        Command::Signin(credentials) => {
            let (user, tokens) = client
                .signin(&credentials)
                .await
                .map_err(friendly)?
                .into_parts();
            let name = user.display_name();
            client.session().login(user, tokens).map_err(friendly)?;
            println!("Welcome back, {name}!");
        }
        Command::Forgot { email } => {
            client.forgot_password(&email).await.map_err(friendly)?;
            println!("If an account exists for {}, a reset code is on its way.", email.trim());
        }
        Command::Reset(request) => {
            let ack = client.reset_password(&request).await.map_err(friendly)?;
            println!(
                "{}",
                ack.message
                    .unwrap_or_else(|| "Password updated. You can now sign in.".to_string())
            );
        }
    }

    Ok(())
}
