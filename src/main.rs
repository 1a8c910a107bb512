use std::process::ExitCode;
use std::sync::Arc;

use simgate::auth::NoopHooks;
use simgate::config::{load_config, print_schema};
use simgate::startup::build_client;
use simgate::store::AmbientContext;
use simgate::utils::logger::init_logging;
use simgate::ApiRequest;
use tracing::error;

const USAGE: &str = "usage: simgate --schema | simgate --config <file> <path>";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--schema") {
        return match print_schema() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to render schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let (config_path, path) = match args.as_slice() {
        [flag, config_path, path] if flag == "--config" => (config_path, path),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let client = match build_client(&config, AmbientContext::new(), Arc::new(NoopHooks)).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match client.send(ApiRequest::get(path.as_str())).await {
        Ok(response) => {
            match response.json::<serde_json::Value>() {
                Ok(value) => match serde_json::to_string_pretty(&value) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(_) => println!("{}", value),
                },
                Err(_) => println!("{}", String::from_utf8_lossy(&response.body)),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(status = ?e.status(), "Request failed: {}", e.message());
            ExitCode::FAILURE
        }
    }
}
