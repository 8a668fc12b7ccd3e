//! Intake server binary
//!
//! Starts the ingestion HTTP server.

use intake_server::{config::IntakeConfig, start_server, ServerError};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        IntakeConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using defaults");
        eprintln!("Usage: intake --config <path-to-config.toml>");
        eprintln!();
        IntakeConfig::default()
    };

    start_server(config).await
}

fn print_help() {
    println!("Intake - URL and text ingestion service");
    println!();
    println!("USAGE:");
    println!("    intake --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG           Log filter (default: info)");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address, bind_port: listener (default 127.0.0.1:8080)");
    println!("    - database_path: SQLite file (default intake.db)");
    println!("    - [gate] threshold: minimum score for the full pipeline (default 0.5)");
    println!("    - [retention] low_score_days, manual_days, sweep_interval_secs");
    println!("    - [jobs] ttl_secs: job lifetime (default 900)");
    println!("    - [cache] ttl_secs: dedup entry lifetime (default 30 days)");
    println!("    - [upstream] scorer_url, scraper_url, analyzer_url, timeout_secs, max_retries");
    println!("    - [dispatch] max_concurrent, job_timeout_secs");
    println!();
}
