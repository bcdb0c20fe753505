//! Deterministic provisioning and security reports.
//!
//! Pure derivations over the record sequence; no I/O, no randomness, same
//! input gives the same output.

use serde::Serialize;

use crate::records::{sentinel, MemberRecord};

/// One actionable row in the provisioning plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningEntry {
    pub name: String,
    pub reason: String,
    pub action: String,
}

impl ProvisioningEntry {
    fn new(name: &str, reason: &str, action: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
            action: action.to_string(),
        }
    }
}

/// The four fixed buckets of the provisioning plan. Buckets are
/// independent: one member may land in several, and twice in `review`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisioningRecommendations {
    pub provision: Vec<ProvisioningEntry>,
    pub deprovision: Vec<ProvisioningEntry>,
    pub review: Vec<ProvisioningEntry>,
    pub upgrade_needed: Vec<ProvisioningEntry>,
}

impl ProvisioningRecommendations {
    pub fn is_empty(&self) -> bool {
        self.provision.is_empty()
            && self.deprovision.is_empty()
            && self.review.is_empty()
            && self.upgrade_needed.is_empty()
    }
}

/// Evaluate the provisioning predicates for every record.
pub fn provisioning_plan(records: &[MemberRecord]) -> ProvisioningRecommendations {
    let mut plan = ProvisioningRecommendations::default();

    for member in records {
        if member.email == sentinel::FREE_TIER_UNAVAILABLE {
            plan.review.push(ProvisioningEntry::new(
                &member.name,
                "Email not available - manual review required",
                "Verify member access and contact information",
            ));
        }

        if member.last_login == sentinel::FREE_TIER_UNAVAILABLE {
            plan.upgrade_needed.push(ProvisioningEntry::new(
                &member.name,
                "Activity data requires paid plan",
                "Consider upgrading Trello plan for better user management",
            ));
        }

        if member.role == sentinel::DEFAULT_ROLE && member.name != sentinel::CURRENT_USER_NAME {
            plan.review.push(ProvisioningEntry::new(
                &member.name,
                "Role verification needed",
                "Confirm appropriate access level",
            ));
        }
    }

    plan
}

/// Security posture summary over the same records.
pub fn security_report(records: &[MemberRecord]) -> String {
    let no_email = records
        .iter()
        .filter(|member| member.email == sentinel::FREE_TIER_UNAVAILABLE)
        .count();
    let unknown_names = records
        .iter()
        .filter(|member| member.name.contains(sentinel::UNKNOWN))
        .count();

    let mut concerns = Vec::new();
    if no_email > 0 {
        concerns.push(format!("- {no_email} members without email data"));
    }
    if unknown_names > 0 {
        concerns.push(format!("- {unknown_names} members with unknown names"));
    }
    let concerns = if concerns.is_empty() {
        "- No major security concerns identified".to_string()
    } else {
        concerns.join("\n")
    };

    format!(
        "\nSECURITY ANALYSIS REPORT\n{rule}\n\
         \nTeam Size: {team_size} members\n\
         \nSECURITY CONCERNS:\n{concerns}\n\
         \nRECOMMENDATIONS:\n\
         1. Enable audit logging (requires paid plan)\n\
         2. Regular access reviews\n\
         3. Implement least privilege access\n\
         4. Monitor for unusual activity\n\
         5. Use strong authentication methods\n\
         \nNEXT STEPS:\n\
         - Consider upgrading to paid Trello plan for better security features\n\
         - Implement regular user access reviews\n\
         - Set up automated monitoring for team changes\n",
        rule = "=".repeat(40),
        team_size = records.len(),
    )
}
