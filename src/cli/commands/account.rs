use clap::{Arg, ArgAction, Command};

fn email() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
        .env("AUTHFRONT_EMAIL")
}

fn password() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env("AUTHFRONT_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn confirm() -> Arg {
    Arg::new("confirm")
        .long("confirm")
        .help("Password confirmation, checked locally before sending")
        .hide_env_values(true)
}

fn code() -> Arg {
    Arg::new("code")
        .short('c')
        .long("code")
        .help("Code received by email")
}

pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new("signup")
                .about("Create an account and wait for email verification")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Display name")
                        .required(true),
                )
                .arg(email().required(true))
                .arg(password())
                .arg(confirm()),
        )
        .subcommand(
            Command::new("verify")
                .about("Confirm the pending account with the emailed code")
                .arg(email().help("Account email address (default: the pending verification)"))
                .arg(code().required_unless_present("cancel"))
                .arg(
                    Arg::new("cancel")
                        .long("cancel")
                        .help("Forget the pending verification")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("code"),
                ),
        )
        .subcommand(
            Command::new("signin")
                .about("Sign in with email and password")
                .arg(email().required(true))
                .arg(password()),
        )
        .subcommand(
            Command::new("forgot")
                .about("Request a password reset code")
                .arg(email().required(true)),
        )
        .subcommand(
            Command::new("reset")
                .about("Set a new password using the emailed code")
                .arg(email().required(true))
                .arg(code().required(true))
                .arg(password().help("New password"))
                .arg(confirm()),
        )
}
