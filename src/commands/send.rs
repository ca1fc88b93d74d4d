use clap::ArgMatches;
use gchat_output::GoogleChatOutput;

use super::{init_tracing, load_config, read_batch};

pub async fn run(matches: &ArgMatches) {
    init_tracing();

    let config = load_config(matches);
    let output = match GoogleChatOutput::configure(&config) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let batch = read_batch(matches).await;
    match output.dispatch(&batch).await {
        Ok(report) => {
            println!(
                "✓ {} event(s) in {} message(s): {} delivered, {} discarded",
                report.events, report.payloads, report.delivered, report.discarded
            );
        }
        Err(e) => {
            // Transient: the caller may rerun the same batch.
            eprintln!("✗ {} ({})", e, e.kind());
            std::process::exit(1);
        }
    }
}
