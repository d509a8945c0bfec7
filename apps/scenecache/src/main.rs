//! # scenecache
//!
//! The main binary for loading and inspecting reconstruction database caches.
//!
//! ## Usage
//!
//! ```bash
//! # Create a database and import a dataset
//! scenecache init
//! scenecache import -f dataset.json
//!
//! # Query a filtered cache
//! scenecache stats --min-num-matches 15 --ignore-watermarks
//! scenecache pair --first 1 --second 2 -c filters.toml
//! scenecache neighbors --image 7 --image-name a.jpg --json-mode
//! ```

use clap::Parser;
use scenecache::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Initialize tracing. SCENECACHE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("SCENECACHE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("scenecache={default_level},scenecache_core={default_level}").into()
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!("scenecache v{}", env!("CARGO_PKG_VERSION"));
    println!();
}
