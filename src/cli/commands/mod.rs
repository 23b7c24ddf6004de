pub mod auth;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_IMAGES_DIR: &str = "images-dir";
pub const ARG_MODEL: &str = "model";

pub const CMD_SERVER: &str = "server";
pub const CMD_SEED: &str = "seed";

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

    let command = Command::new("photoshare")
        .about("Photo sharing service")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("PHOTOSHARE_DSN")
                .global(true),
        )
        .arg(
            Arg::new(ARG_IMAGES_DIR)
                .long("images-dir")
                .help("Directory holding uploaded images, served under /images")
                .env("PHOTOSHARE_IMAGES_DIR")
                .default_value("./images")
                .global(true),
        )
        .subcommand(server_command())
        .subcommand(seed_command());

    let command = with_server_args(command);
    let command = auth::with_args(command);
    logging::with_args(command)
}

fn with_server_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_PORT)
            .short('p')
            .long("port")
            .help("Port to listen on")
            .default_value("3000")
            .env("PHOTOSHARE_PORT")
            .global(true)
            .value_parser(clap::value_parser!(u16)),
    )
}

fn server_command() -> Command {
    Command::new(CMD_SERVER).about("Serve the HTTP API (default)")
}

fn seed_command() -> Command {
    Command::new(CMD_SEED)
        .about("Replace all data with the bundled model data")
        .arg(
            Arg::new(ARG_MODEL)
                .long("model")
                .help("Load model data from this JSON file instead of the bundled set")
                .env("PHOTOSHARE_SEED_MODEL"),
        )
}
