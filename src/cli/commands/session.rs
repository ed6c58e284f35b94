use clap::{Arg, ArgAction, Command};

pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(Command::new("refresh").about("Exchange the refresh token for a new access token"))
        .subcommand(
            Command::new("google").about("Print the Google sign-in URL to open in a browser"),
        )
        .subcommand(
            Command::new("callback")
                .about("Complete Google sign-in from the redirect URL")
                .arg(
                    Arg::new("url")
                        .help("Redirect URL (or its query string) the browser landed on")
                        .required(true),
                ),
        )
        .subcommand(Command::new("whoami").about("Show the signed-in user"))
        .subcommand(
            Command::new("logout")
                .about("Sign out and forget stored credentials")
                .arg(
                    Arg::new("global")
                        .long("global")
                        .help("Also invalidate the session on the server")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("health").about("Check that the auth API is reachable"))
}
