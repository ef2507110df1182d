use tracing::error;

use traceexpress_client::config::{load_config, print_schema};
use traceexpress_client::startup::{build_client, Invocation};
use traceexpress_client::utils::logger::init_logging;

const USAGE: &str = "usage: traceexpress-client [--schema] [--metrics] <METHOD> <PATH> [JSON_BODY]";

#[tokio::main]
async fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--schema") {
        print_schema();
        return;
    }
    let show_metrics = args.iter().any(|a| a == "--metrics");
    args.retain(|a| a != "--metrics");

    let invocation = match Invocation::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = load_config();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let client = match build_client(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build API client: {}", e);
            std::process::exit(1);
        }
    };

    let result = client.request(invocation.to_request()).await;
    if show_metrics {
        eprintln!("{}", client.metrics().render());
    }

    match result {
        Ok(response) => println!("{}", response.text()),
        Err(e) => {
            error!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}
