#![allow(clippy::multiple_crate_versions)]

use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Output configuration (TOML)")
        .default_value("gchat-relay.toml")
}

fn input_arg() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .value_name("FILE")
        .help("JSON lines batch to read; stdin when omitted")
}

#[tokio::main]
async fn main() {
    let matches = Command::new("gchat-relay")
        .version(VERSION)
        .about("Forward buffered log records to Google Chat spaces")
        .subcommand(
            Command::new("check")
                .about("Validate the configuration and print the resolved settings")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("render")
                .about("Render a batch into per-space messages without sending")
                .arg(config_arg())
                .arg(input_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print payloads as JSON"),
                ),
        )
        .subcommand(
            Command::new("send")
                .about("Send a batch to Google Chat")
                .arg(config_arg())
                .arg(input_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("check", sub_matches)) => commands::check::run(sub_matches).await,
        Some(("render", sub_matches)) => commands::render::run(sub_matches).await,
        Some(("send", sub_matches)) => commands::send::run(sub_matches).await,
        _ => {
            println!("gchat-relay v{}", VERSION);
            println!("Use --help for available commands");
        }
    }
}
