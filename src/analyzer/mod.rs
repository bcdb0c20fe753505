//! Narrative analysis of the extracted member data.
//!
//! One remote generation attempt, then a deterministic rule-based report.
//! This module never fails: whatever the backend does, the caller gets
//! analysis text.

pub mod remote;

use tracing::warn;

use crate::records::MemberRecord;

use remote::{GenerationParams, RemoteOutcome, TextGenerator};

/// Turns member records into narrative text.
pub struct MemberAnalyzer<G: TextGenerator> {
    generator: G,
    params: GenerationParams,
}

impl<G: TextGenerator> MemberAnalyzer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            params: GenerationParams::default(),
        }
    }

    /// One-shot remote analysis with the rule-based fallback. Always
    /// returns text; remote failures are logged and absorbed.
    pub async fn analyze(&self, records: &[MemberRecord]) -> String {
        let prompt = build_prompt(records);
        match self.generator.generate(&prompt, &self.params).await {
            RemoteOutcome::Success(text) => text,
            RemoteOutcome::Failure(reason) => {
                warn!(%reason, "remote analysis failed; using rule-based fallback");
                fallback_report(records)
            }
        }
    }
}

/// Prompt for the remote call: the serialized records plus five fixed
/// instruction headings.
pub fn build_prompt(records: &[MemberRecord]) -> String {
    let members_json = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
    format!(
        "\nTask: Analyze the following Trello team member data and provide insights.\n\
         \nTeam Member Data:\n{members_json}\n\
         \nPlease provide a comprehensive analysis including:\n\
         1. Team composition summary\n\
         2. Data quality assessment\n\
         3. Security recommendations\n\
         4. User management suggestions\n\
         5. Any anomalies or concerns\n\
         \nAnalysis:\n"
    )
}

/// Deterministic analysis used when the remote call fails. Pure string
/// formatting over the records; cannot fail.
pub fn fallback_report(records: &[MemberRecord]) -> String {
    let total = records.len();
    let with_email = records.iter().filter(|record| record.has_real_email()).count();
    let email_pct = if total == 0 {
        0.0
    } else {
        (with_email as f64 / total as f64) * 100.0
    };

    let mut report = format!(
        "\nTRELLO TEAM ANALYSIS REPORT\n{rule}\n\
         \nTEAM COMPOSITION:\n\
         - Total Members: {total}\n\
         - Members with Email Data: {with_email}\n\
         - Members without Email Data: {without_email}\n\
         \nMEMBER DETAILS:\n",
        rule = "=".repeat(50),
        without_email = total - with_email,
    );

    for (index, member) in records.iter().enumerate() {
        report.push_str(&format!(
            "\n{num}. {name}\n   Email: {email}\n   Role: {role}\n   Last Login: {last_login}\n",
            num = index + 1,
            name = member.name,
            email = member.email,
            role = member.role,
            last_login = member.last_login,
        ));
    }

    report.push_str(&format!(
        "\nDATA QUALITY ASSESSMENT:\n\
         - Email Availability: {email_pct:.1}% of members\n\
         - Role Information: Limited (Free tier restriction)\n\
         - Activity Data: Limited (Free tier restriction)\n\
         \nSECURITY RECOMMENDATIONS:\n\
         1. Upgrade to Trello paid plan for better user management\n\
         2. Regular access reviews for team members\n\
         3. Enable two-factor authentication for all members\n\
         4. Monitor board access and permissions\n\
         \nUSER MANAGEMENT SUGGESTIONS:\n\
         1. Review member access levels regularly\n\
         2. Remove inactive members to reduce security risks\n\
         3. Use proper naming conventions for team organization\n\
         4. Consider board-specific permissions\n\
         \nLIMITATIONS NOTED:\n\
         - Free Trello tier provides limited member data\n\
         - Role and activity information requires paid plan\n\
         - Email data may not be available for all members\n"
    ));

    report
}
