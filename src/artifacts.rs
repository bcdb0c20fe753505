//! Persisted run artifacts: the member CSV and the combined report file.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::records::MemberRecord;
use crate::report::ProvisioningRecommendations;

const SECTION_RULE_WIDTH: usize = 50;

/// Write one CSV row per member, preceded by the header row.
pub fn write_members_csv(path: &Path, records: &[MemberRecord]) -> Result<()> {
    ensure_parent(path)?;

    let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV writer")?;
    wtr.write_record(["name", "username", "email", "role", "last_login"])
        .context("Failed to write CSV header")?;

    for member in records {
        wtr.write_record([
            member.name.as_str(),
            member.username.as_str(),
            member.email.as_str(),
            member.role.as_str(),
            member.last_login.as_str(),
        ])
        .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Concatenate the narrative analysis, the JSON provisioning plan, and the
/// security report under labeled section rules, in that order.
pub fn write_analysis_artifact(
    path: &Path,
    analysis: &str,
    plan: &ProvisioningRecommendations,
    security_report: &str,
) -> Result<()> {
    ensure_parent(path)?;

    let plan_json =
        serde_json::to_string_pretty(plan).context("Failed to serialize provisioning plan")?;
    let rule = "=".repeat(SECTION_RULE_WIDTH);

    let mut file = File::create(path).context("Failed to create analysis file")?;
    write!(
        file,
        "AI ANALYSIS\n{rule}\n{analysis}\n\n\
         PROVISIONING RECOMMENDATIONS\n{rule}\n{plan_json}\n\n\
         SECURITY REPORT\n{rule}\n{security_report}"
    )
    .context("Failed to write analysis file")?;

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create artifact directory")?;
        }
    }
    Ok(())
}
