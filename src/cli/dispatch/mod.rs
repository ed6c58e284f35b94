use crate::{
    cli::{
        actions::{account, google, session, Action},
        globals::GlobalArgs,
    },
    client::{Credentials, ResetPasswordRequest, SignupProfile},
};
use anyhow::{bail, Context, Result};

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// # Errors
/// Returns an error if required arguments are missing or the configuration is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = GlobalArgs::from_matches(matches)?;

    let action = match matches.subcommand() {
        Some(("signup", sub)) => Action::Account(
            globals,
            account::Command::Signup(SignupProfile {
                name: required(sub, "name")?,
                email: required(sub, "email")?,
                password: required(sub, "password")?,
                confirm_password: sub.get_one::<String>("confirm").cloned(),
            }),
        ),
        Some(("verify", sub)) => {
            let command = if sub.get_flag("cancel") {
                account::Command::CancelVerification
            } else {
                account::Command::Verify {
                    email: sub.get_one::<String>("email").cloned(),
                    code: required(sub, "code")?,
                }
            };
            Action::Account(globals, command)
        }
        Some(("signin", sub)) => Action::Account(
            globals,
            account::Command::Signin(Credentials {
                email: required(sub, "email")?,
                password: required(sub, "password")?,
            }),
        ),
        Some(("forgot", sub)) => Action::Account(
            globals,
            account::Command::Forgot {
                email: required(sub, "email")?,
            },
        ),
        Some(("reset", sub)) => Action::Account(
            globals,
            account::Command::Reset(ResetPasswordRequest {
                email: required(sub, "email")?,
                code: required(sub, "code")?,
                new_password: required(sub, "password")?,
                confirm_password: sub.get_one::<String>("confirm").cloned(),
            }),
        ),
        Some(("refresh", _)) => Action::Session(globals, session::Command::Refresh),
        Some(("whoami", _)) => Action::Session(globals, session::Command::Whoami),
        Some(("logout", sub)) => Action::Session(
            globals,
            session::Command::Logout {
                global: sub.get_flag("global"),
            },
        ),
        Some(("health", _)) => Action::Session(globals, session::Command::Health),
        Some(("google", _)) => Action::Google(globals, google::Command::Begin),
        Some(("callback", sub)) => Action::Google(
            globals,
            google::Command::Callback {
                url: required(sub, "url")?,
            },
        ),
        Some((name, _)) => bail!("unknown command: {name}"),
        None => bail!("missing command"),
    };

    Ok(action)
}
