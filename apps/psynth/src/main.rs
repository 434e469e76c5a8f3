//! # Psynth - graph client
//!
//! Command-line client for the Psynth graph-visualization service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   apps/psynth (THE BINARY)               │
//! │                                                          │
//! │  ┌───────────┐    ┌───────────────┐    ┌─────────────┐  │
//! │  │   CLI     │───▶│ SessionHandle │───▶│ HTTP client │  │
//! │  │  (clap)   │    │ (worker)      │    │ (reqwest)   │  │
//! │  └───────────┘    └───────┬───────┘    └─────────────┘  │
//! │                           ▼                              │
//! │                   ┌───────────────┐                      │
//! │                   │  psynth-core  │                      │
//! │                   │  (THE MODEL)  │                      │
//! │                   └───────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! export PSYNTH_USER=ada PSYNTH_KEY=...
//! psynth create --name "My graph"
//! psynth list
//! psynth show --filename <filename>
//! psynth request --filename <filename> --op getheat
//! psynth demo --name "Ring" --nodes 8
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize tracing. PSYNTH_LOG_FORMAT=json selects JSON lines.
    let log_format = std::env::var("PSYNTH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "psynth=debug,psynth_core=debug"
    } else {
        "psynth=info,psynth_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
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

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┌─┐┬ ┬┌┐┌┌┬┐┬ ┬
  ├─┘└─┐└┬┘│││ │ ├─┤
  ┴  └─┘ ┴ ┘└┘ ┴ ┴ ┴  graph client v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
