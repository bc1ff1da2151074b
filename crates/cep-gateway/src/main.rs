//! cep-gateway: CEP Locality Gateway Main Binary
//!
//! Main entry point for the CEP locality gateway.
//!
//! Usage:
//!   cep-gateway                 - Start server mode (HTTP API)
//!   cep-gateway --scrape AC,SP  - Scrape once and print the result as JSON
//!   cep-gateway --help          - Show help

mod cli;
mod error;

use std::sync::Arc;

use cep_api::AppState;
use cep_browser::{BrowserConfig, ChromeDriverFactory, RegionResolver};
use cep_core::{Config, FileSink, LocalityStore};
use tracing_subscriber::EnvFilter;

use crate::error::{GatewayError, Result};

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Server mode (HTTP API)
    Server,
    /// One-shot scrape of the given region codes
    Scrape(Vec<String>),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let mode = parse_args(std::env::args().skip(1))?;

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("cep-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging; stdout is reserved for scrape output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(GatewayError::from)?;

    tracing::info!("Starting cep-gateway...");
    tracing::info!("Target: {}", config.scraper.target_url);
    tracing::info!(
        "Deadline: {}s, failure policy: {:?}",
        config.scraper.deadline_secs,
        config.scraper.failure_policy
    );

    let resolver = build_resolver(&config);

    match mode {
        RunMode::Scrape(codes) => {
            let outputs = cli::Outputs {
                sink: build_sink(&config),
                store: open_store(&config)?,
            };
            let json = cli::run_scrape(&resolver, outputs, &codes).await?;
            println!("{}", json);
            Ok(())
        }
        RunMode::Server => run_server(config, resolver).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--scrape" | "-s" => {
                let value = args
                    .next()
                    .ok_or_else(|| GatewayError::Usage(format!("{} needs region codes", arg)))?;
                return Ok(RunMode::Scrape(split_codes(&value)));
            }
            other => {
                if let Some(value) = other.strip_prefix("--scrape=") {
                    return Ok(RunMode::Scrape(split_codes(value)));
                }
                return Err(GatewayError::Usage(format!("unknown argument {}", other)));
            }
        }
    }

    Ok(RunMode::Server)
}

fn split_codes(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// Print help message
fn print_help() {
    println!("cep-gateway - CEP locality gateway");
    println!();
    println!("Usage:");
    println!("  cep-gateway                  Start server mode (HTTP API)");
    println!("  cep-gateway --scrape AC,SP   Scrape up to 5 regions once and print JSON");
    println!("  cep-gateway --help           Show this help message");
    println!("  cep-gateway --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  API_PORT                   HTTP API port (default: 8080)");
    println!("  CEP_TARGET_URL             Lookup page URL");
    println!("  CEP_DEADLINE_SECS          Deadline per request (default: 60)");
    println!("  CEP_ELEMENT_TIMEOUT_SECS   Wait limit per element (default: 20)");
    println!("  CEP_SETTLE_DELAY_MS        Wait after each click (default: 1000)");
    println!("  CEP_MAX_PAGES              Result pages per region (default: 500)");
    println!("  CEP_HEADLESS               Run Chrome headless (default: true)");
    println!("  CEP_FAILURE_POLICY         fail_fast or collect_errors (default: fail_fast)");
    println!("  STORE_ENABLED              Persist results to SQLite (default: false)");
    println!("  DB_PATH                    SQLite database path");
    println!("  OUTPUT_ENABLED             Write result files (default: true)");
    println!("  OUTPUT_JSONL_PATH          JSONL result file (default: result.jsonl)");
    println!("  OUTPUT_JSON_PATH           JSON result file (default: result.json)");
}

fn build_resolver(config: &Config) -> RegionResolver {
    let factory = ChromeDriverFactory::new(BrowserConfig::from(&config.scraper));
    RegionResolver::new(Arc::new(factory), &config.scraper)
}

fn build_sink(config: &Config) -> Option<FileSink> {
    config
        .output
        .enabled
        .then(|| FileSink::from_config(&config.output))
}

fn open_store(config: &Config) -> Result<Option<LocalityStore>> {
    if !config.store.enabled {
        tracing::info!("Persistence is disabled");
        return Ok(None);
    }

    tracing::info!("Opening store at {}", config.store.db_path);
    Ok(Some(LocalityStore::new(&config.store.db_path)?))
}

/// Run server mode (HTTP API)
async fn run_server(config: Config, resolver: RegionResolver) -> anyhow::Result<()> {
    let mut state = AppState::new(resolver);

    if let Some(store) = open_store(&config)? {
        state = state.with_store(store);
    }
    if let Some(sink) = build_sink(&config) {
        tracing::info!(
            "Writing results to {} and {}",
            sink.jsonl_path().display(),
            sink.json_path().display()
        );
        state = state.with_sink(sink);
    }

    tracing::info!("cep-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    cep_api::start_server(config.api.port, state, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
    tracing::info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_args_modes() {
        assert_eq!(parse_args(args(&[])).unwrap(), RunMode::Server);
        assert_eq!(parse_args(args(&["--help"])).unwrap(), RunMode::Help);
        assert_eq!(parse_args(args(&["-v"])).unwrap(), RunMode::Version);
    }

    #[test]
    fn test_parse_args_scrape() {
        let expected = RunMode::Scrape(vec!["AC".into(), "SP".into()]);
        assert_eq!(parse_args(args(&["--scrape", "AC,SP"])).unwrap(), expected);
        assert_eq!(parse_args(args(&["-s", "AC,SP"])).unwrap(), expected);
        assert_eq!(parse_args(args(&["--scrape=AC,SP"])).unwrap(), expected);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(matches!(
            parse_args(args(&["--scrape"])),
            Err(GatewayError::Usage(_))
        ));
        assert!(matches!(
            parse_args(args(&["--cli"])),
            Err(GatewayError::Usage(_))
        ));
    }

    #[test]
    fn test_sink_and_store_follow_config() {
        let mut config = Config::default();
        assert!(build_sink(&config).is_some());
        assert!(open_store(&config).unwrap().is_none());

        config.output.enabled = false;
        assert!(build_sink(&config).is_none());
    }
}
