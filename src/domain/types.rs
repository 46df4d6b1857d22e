//! Provider identifiers shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A mailbox provider the inbox can aggregate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gmail API.
    Gmail,
    /// Microsoft Graph (Outlook / Microsoft 365).
    Outlook,
}

impl ProviderKind {
    /// Every supported provider, in aggregation order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gmail, ProviderKind::Outlook];

    /// Stable lowercase name, used as the key for stored tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gmail => "gmail",
            ProviderKind::Outlook => "outlook",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmail" | "google" => Ok(ProviderKind::Gmail),
            "outlook" | "microsoft" => Ok(ProviderKind::Outlook),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}
