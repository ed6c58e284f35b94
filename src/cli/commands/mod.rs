mod account;
mod logging;
mod session;

pub use logging::validator_log_level;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authfront")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .short('u')
                .long("api-url")
                .help("Auth API base URL, example: https://api.example.com")
                .env("AUTHFRONT_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .help("Directory holding the persisted session, one file per API origin")
                .env("AUTHFRONT_STORAGE_DIR")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Request timeout in seconds")
                .env("AUTHFRONT_TIMEOUT_SECS")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    let command = account::with_subcommands(command);
    let command = session::with_subcommands(command);
    logging::with_args(command)
}
