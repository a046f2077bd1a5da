#![allow(non_snake_case)]

use std::env;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use eventParser::cli;
use eventParser::config::{self, AppConfig};
use eventParser::handlers::parse_event::EventExtractionHandler;
use eventParser::runtime;
use eventParser::service::openai_service::OpenAIService;
use tracing::{error, warn};

const DEFAULT_RUN_MODE: &str = "api";

#[tokio::main]
async fn main() {
    if let Err(e) = runtime::init_logging() {
        eprintln!("{}", e);
    }

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_else(|e| {
            warn!(%path, error = %e, "ignoring unreadable config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };
    let config = Arc::new(config);

    let completions = Arc::new(OpenAIService::from_config(&config));
    let handler = EventExtractionHandler::new(config.clone(), completions);

    let run_mode = config.get_or(config::RUN_MODE, DEFAULT_RUN_MODE);
    if run_mode == "api" {
        let bind = config.get_or(config::BIND_ADDR, config::DEFAULT_BIND_ADDR);
        let addr: SocketAddr = match bind.parse() {
            Ok(addr) => addr,
            Err(e) => {
                error!(%bind, error = %e, "invalid BIND_ADDR");
                process::exit(2);
            }
        };
        runtime::run_api(Arc::new(handler), addr).await;
    } else if run_mode == "cli" {
        if !cli::cli(&handler).await {
            process::exit(1);
        }
    } else {
        error!(%run_mode, "invalid run mode");
        process::exit(2);
    }
}
