pub mod check;
pub mod render;
pub mod send;

use std::path::Path;

use clap::ArgMatches;
use gchat_output::{Batch, OutputConfig};
use tokio::io::AsyncReadExt;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

/// Load the configuration named by `--config`, exiting on failure.
pub fn load_config(matches: &ArgMatches) -> OutputConfig {
    let path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("gchat-relay.toml");
    match OutputConfig::from_file(Path::new(path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

/// Read `--input` (or stdin) and decode it as a batch, exiting on failure.
pub async fn read_batch(matches: &ArgMatches) -> Batch {
    let raw = match matches.get_one::<String>("input") {
        Some(path) => tokio::fs::read(path).await.map_err(|e| format!("{}: {}", path, e)),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .map(|_| buf)
                .map_err(|e| format!("stdin: {}", e))
        }
    };
    let raw = raw.unwrap_or_else(|e| {
        eprintln!("✗ cannot read batch: {}", e);
        std::process::exit(1);
    });

    match gchat_output::decode_batch(&raw) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("✗ invalid batch: {}", e);
            std::process::exit(1);
        }
    }
}
