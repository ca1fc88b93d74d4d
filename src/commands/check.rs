use clap::ArgMatches;
use gchat_output::adapters::google_chat::ServiceAccountKey;
use gchat_output::{Destination, GoogleChatOutput, TimeZoneSetting};

use super::{init_tracing, load_config};

pub async fn run(matches: &ArgMatches) {
    init_tracing();
    println!("🔍 Checking output configuration...\n");

    let config = load_config(matches);
    let output = match GoogleChatOutput::configure(&config) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };
    let settings = output.settings();

    match &settings.destination {
        Destination::Fixed(space) => println!("• Space: {}", space),
        Destination::Templated(t) => println!("• Space: per record from {:?}", t.keys()),
    }
    println!("• Message keys: {:?}", settings.message.keys());
    let zone = match settings.time.zone() {
        TimeZoneSetting::Local => "local".to_string(),
        TimeZoneSetting::Utc => "UTC".to_string(),
        TimeZoneSetting::Named(tz) => tz.name().to_string(),
    };
    println!("• Time zone: {}", zone);
    println!("• Endpoint: {}", settings.client.endpoint);
    match settings.client.https_proxy {
        Some(ref proxy) => println!("• Proxy: {}", proxy),
        None => println!("○ No proxy"),
    }

    print!("• Checking keyfile... ");
    match ServiceAccountKey::load(&settings.keyfile).await {
        Ok(key) => println!("✓ service account {}", key.client_email),
        Err(e) => {
            println!("✗ {}", e);
            std::process::exit(1);
        }
    }

    println!("\n✅ Configuration is valid");
}
