use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// The user's decision on a match. Local-only state: the remote service has no
/// notion of it, so every freshly fetched record starts out `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum MatchStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Declined => "declined",
        }
    }

    /// Whether the user has made a decision on this match.
    pub fn is_decided(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(MatchStatus::Pending),
            "accepted" | "accept" => Ok(MatchStatus::Accepted),
            "declined" | "decline" => Ok(MatchStatus::Declined),
            other => Err(format!("unknown match status: {}", other)),
        }
    }
}

// Stored files may predate a status value; anything unrecognised reads back as pending.
impl<'de> Deserialize<'de> for MatchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

/// A single profile match, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MatchRecord {
    pub id: String,
    #[serde(rename = "profileImageUrl", default)]
    pub profile_image_url: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: MatchStatus,
}

impl MatchRecord {
    pub fn new(
        id: impl Into<String>,
        profile_image_url: impl Into<String>,
        display_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            profile_image_url: profile_image_url.into(),
            display_name: display_name.into(),
            address: address.into(),
            status: MatchStatus::Pending,
        }
    }

    /// Name to show when the remote profile carried no name parts.
    pub fn display_name_or_placeholder(&self) -> &str {
        if self.display_name.is_empty() {
            "(unnamed)"
        } else {
            &self.display_name
        }
    }
}
