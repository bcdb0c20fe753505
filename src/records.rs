//! Member records extracted from the board facepile.

use serde::Serialize;

/// Fixed strings standing in for data the free tier does not expose.
///
/// Extraction, analysis, and reporting all compare against these exact
/// values, so they live here and nowhere else.
pub mod sentinel {
    /// Placeholder for email and last-login fields the free tier hides.
    pub const FREE_TIER_UNAVAILABLE: &str = "Not available in free tier";
    /// Username placeholder when a facepile title carries no handle. Also
    /// the marker substring the security report scans names for.
    pub const UNKNOWN: &str = "Unknown";
    /// Name of the synthesized record for the session owner.
    pub const CURRENT_USER_NAME: &str = "Current User";
    pub const CURRENT_USER_USERNAME: &str = "current_user";
    pub const CURRENTLY_ACTIVE: &str = "Currently active";
    pub const DEFAULT_ROLE: &str = "Member";
    pub const ADMIN_ROLE: &str = "Admin";
}

/// One board member as read from the rendered page.
///
/// Records are immutable after extraction and keep DOM encounter order.
/// Field order here fixes both the CSV column order and the JSON key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRecord {
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub last_login: String,
}

impl MemberRecord {
    /// Build a record from a facepile `title` attribute.
    ///
    /// Returns `None` when the title cannot yield a non-empty name.
    pub fn from_facepile_title(title: &str) -> Option<Self> {
        let (name, username) = parse_facepile_title(title)?;
        Some(Self {
            name,
            username,
            email: sentinel::FREE_TIER_UNAVAILABLE.to_string(),
            role: sentinel::DEFAULT_ROLE.to_string(),
            last_login: sentinel::FREE_TIER_UNAVAILABLE.to_string(),
        })
    }

    /// The synthesized record for the logged-in operator, used when the
    /// facepile exposes no members at all.
    pub fn current_user(email: &str) -> Self {
        Self {
            name: sentinel::CURRENT_USER_NAME.to_string(),
            username: sentinel::CURRENT_USER_USERNAME.to_string(),
            email: email.to_string(),
            role: sentinel::ADMIN_ROLE.to_string(),
            last_login: sentinel::CURRENTLY_ACTIVE.to_string(),
        }
    }

    /// Whether the email field carries a real address.
    pub fn has_real_email(&self) -> bool {
        self.email != sentinel::FREE_TIER_UNAVAILABLE
    }
}

/// Split a facepile title of the form `"Jane Doe (jdoe)"` into name and
/// username. Titles without a closed parenthesized handle keep the whole
/// trimmed string as the name and get the `Unknown` username. Returns
/// `None` when the name part trims to empty.
pub fn parse_facepile_title(title: &str) -> Option<(String, String)> {
    let (name, username) = match title.split_once('(') {
        Some((before, after)) if title.contains(')') => {
            let handle = after.split(')').next().unwrap_or("").trim();
            (before.trim(), handle)
        }
        _ => (title.trim(), sentinel::UNKNOWN),
    };

    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), username.to_string()))
}
