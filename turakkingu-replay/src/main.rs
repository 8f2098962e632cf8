//! turakkingu replay
//!
//! Drives the tracker through a scripted page session against a real
//! collector, which is handy for checking a collector deployment or
//! inspecting how links get decorated.
//!
//! Usage:
//!   turakkingu-replay --page-url https://shop.example.com/ --script session.json

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use turakkingu_delivery::HttpTransport;
use turakkingu_replay::{parse_script, replay, ReplayOptions};
use turakkingu_tracker::TrackerConfig;

#[derive(Parser, Debug)]
#[command(name = "turakkingu-replay")]
#[command(about = "Replay a scripted page session through the tracker")]
struct Args {
    /// URL of the simulated page, including any inbound tracking parameters
    #[arg(long)]
    page_url: String,

    /// JSON list of page steps
    #[arg(short, long)]
    script: PathBuf,

    /// Collector base URL (overrides the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Tracker configuration as JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User agent of the simulated browser
    #[arg(long)]
    user_agent: Option<String>,

    /// Referrer of the simulated page
    #[arg(long, default_value = "")]
    referrer: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<TrackerConfig>(&raw).context("invalid tracker config")?
        }
        None => TrackerConfig::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let steps = parse_script(&script)?;

    let transport = HttpTransport::new(Duration::from_secs(args.timeout))
        .context("failed to build HTTP client")?;

    let mut options = ReplayOptions::new(args.page_url);
    options.config = config;
    options.referrer = args.referrer;
    if let Some(ua) = args.user_agent {
        options.user_agent = ua;
    }

    info!(endpoint = %options.config.endpoint, "starting replay");
    let report = replay(options, steps, Arc::new(transport)).await?;

    println!("\n========================================");
    println!("  Replay Finished");
    println!("========================================");
    println!(
        "  Session:   {}",
        report.session_id.as_deref().unwrap_or("(none)")
    );
    println!("  Delivered: {} (incl. session end)", report.delivered);
    println!("  Abandoned: {}", report.abandoned);
    for rewrite in &report.rewrites {
        println!("\n  {}", rewrite.before);
        println!("    -> {}", rewrite.after);
        for (name, value) in &rewrite.added_fields {
            println!("    + {name}={value}");
        }
    }
    println!("========================================\n");

    Ok(())
}
