use clap::ArgMatches;
use gchat_output::OutputConfig;

use super::{init_tracing, load_config, read_batch};

/// Print what `send` would post, one block per space.
/// Missing-key warnings go to stderr, so stdout stays the rendered text.
pub async fn run(matches: &ArgMatches) {
    init_tracing();

    let config: OutputConfig = load_config(matches);
    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let batch = read_batch(matches).await;
    let payloads = settings.payload_builder().build(&batch);

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&payloads) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for payload in &payloads {
        println!("== {} ==", payload.space);
        print!("{}", payload.text);
    }
}
