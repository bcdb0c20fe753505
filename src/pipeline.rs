//! Top-level run orchestration: scrape, persist, analyze, report.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::analyzer::remote::TextGenerator;
use crate::analyzer::MemberAnalyzer;
use crate::artifacts;
use crate::config::AppConfig;
use crate::report;
use crate::session::browser::BrowserControl;
use crate::session::gate::VerificationGate;
use crate::session::SessionDriver;

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub members_found: usize,
    pub artifacts_written: bool,
}

/// Drive one complete audit pass. The browser is released on every exit
/// path, including failed startup and empty extractions.
pub async fn run_audit<B, G, T>(
    config: &AppConfig,
    mut driver: SessionDriver<B, G>,
    generator: T,
) -> Result<RunSummary>
where
    B: BrowserControl,
    G: VerificationGate,
    T: TextGenerator,
{
    let outcome = execute(config, &mut driver, generator).await;
    driver.close().await;
    outcome
}

async fn execute<B, G, T>(
    config: &AppConfig,
    driver: &mut SessionDriver<B, G>,
    generator: T,
) -> Result<RunSummary>
where
    B: BrowserControl,
    G: VerificationGate,
    T: TextGenerator,
{
    driver
        .initialize()
        .await
        .context("Failed to start the browser engine")?;

    println!("Scraping Trello member data...");
    let members = driver.scrape(config).await;

    if members.is_empty() {
        println!("No member data found. Please check your Trello board access.");
        warn!("run ended without member data");
        return Ok(RunSummary {
            members_found: 0,
            artifacts_written: false,
        });
    }

    let csv_path = config.members_csv_path();
    artifacts::write_members_csv(&csv_path, &members)
        .with_context(|| format!("Failed to save members to {}", csv_path.display()))?;
    println!("Saved {} members to {}", members.len(), csv_path.display());

    println!("Processing data with the AI agent...");
    let analyzer = MemberAnalyzer::new(generator);
    let analysis = analyzer.analyze(&members).await;

    println!("Generating additional reports...");
    let plan = report::provisioning_plan(&members);
    let security = report::security_report(&members);

    print_results(&analysis, &plan, &security)?;

    let artifact_path = config.analysis_path();
    artifacts::write_analysis_artifact(&artifact_path, &analysis, &plan, &security)
        .with_context(|| format!("Failed to save analysis to {}", artifact_path.display()))?;
    println!();
    println!("All analysis results saved to {}", artifact_path.display());

    info!(members = members.len(), "audit complete");
    Ok(RunSummary {
        members_found: members.len(),
        artifacts_written: true,
    })
}

fn print_results(
    analysis: &str,
    plan: &report::ProvisioningRecommendations,
    security: &str,
) -> Result<()> {
    let rule = "=".repeat(50);

    println!();
    println!("{rule}");
    println!("AI ANALYSIS RESULTS");
    println!("{rule}");
    println!("{analysis}");

    println!();
    println!("{rule}");
    println!("PROVISIONING RECOMMENDATIONS");
    println!("{rule}");
    println!(
        "{}",
        serde_json::to_string_pretty(plan).context("Failed to render provisioning plan")?
    );

    println!();
    println!("{rule}");
    println!("SECURITY REPORT");
    println!("{rule}");
    println!("{security}");

    Ok(())
}
