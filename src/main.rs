use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boardaudit::analyzer::remote::generator_for;
use boardaudit::config::AppConfig;
use boardaudit::pipeline::run_audit;
use boardaudit::session::chrome::{BrowserOptions, ChromiumBrowser};
use boardaudit::session::gate::ConsoleGate;
use boardaudit::session::SessionDriver;

/// BoardAudit - single-shot Trello board member audit
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Run the browser without a window. Verification challenges cannot be
    /// completed in this mode.
    #[arg(long)]
    headless: bool,

    /// Launch Chromium with its sandbox disabled. Needed inside some
    /// containers.
    #[arg(long)]
    no_sandbox: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A local .env file is the usual place for credentials.
    dotenv::dotenv().ok();

    init_logging(&cli.log_level, cli.debug)?;

    println!("Starting Trello board audit...");

    let result = run(&cli).await;
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Audit failed: {}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = AppConfig::from_env().context("Configuration error")?;
    let generator =
        generator_for(&config.backend).context("Failed to build the inference client")?;

    let options = BrowserOptions {
        headless: cli.headless,
        no_sandbox: cli.no_sandbox,
        ..BrowserOptions::default()
    };
    let driver = SessionDriver::new(ChromiumBrowser::new(options), ConsoleGate);

    run_audit(&config, driver, generator).await?;
    Ok(())
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
