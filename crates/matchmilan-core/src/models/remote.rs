// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MatchRecord, MatchStatus};

// API Response wrappers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePage {
    #[serde(default)]
    pub results: Vec<RemoteProfile>,
    #[serde(default)]
    pub info: Option<PageInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInfo {
    pub seed: Option<String>,
    #[serde(rename = "results")]
    pub count: Option<u32>,
    pub page: Option<u32>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteProfile {
    pub gender: Option<String>,
    pub name: Option<ProfileName>,
    pub location: Option<ProfileLocation>,
    pub email: Option<String>,
    pub login: Option<ProfileLogin>,
    pub dob: Option<ProfileDate>,
    pub registered: Option<ProfileDate>,
    pub phone: Option<String>,
    pub cell: Option<String>,
    pub id: Option<ProfileId>,
    pub picture: Option<ProfilePicture>,
    pub nat: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileName {
    pub title: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileLocation {
    pub street: Option<ProfileStreet>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStreet {
    pub number: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileLogin {
    pub uuid: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDate {
    pub date: Option<String>,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileId {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePicture {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub thumbnail: Option<String>,
}

/// Join the non-empty parts with `sep`, skipping anything blank.
fn join_present<'a>(parts: impl IntoIterator<Item = Option<&'a str>>, sep: &str) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

impl RemoteProfile {
    /// Identity key from the payload, if the service supplied a usable one.
    pub fn identity(&self) -> Option<&str> {
        self.id
            .as_ref()
            .and_then(|id| id.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn display_name(&self) -> String {
        let name = self.name.as_ref();
        join_present(
            [
                name.and_then(|n| n.first.as_deref()),
                name.and_then(|n| n.last.as_deref()),
            ],
            " ",
        )
    }

    pub fn address(&self) -> String {
        let Some(loc) = self.location.as_ref() else {
            return String::new();
        };

        let number = loc
            .street
            .as_ref()
            .and_then(|s| s.number)
            .map(|n| n.to_string());
        let street = join_present(
            [
                number.as_deref(),
                loc.street.as_ref().and_then(|s| s.name.as_deref()),
            ],
            " ",
        );

        join_present(
            [Some(street.as_str()), loc.city.as_deref(), loc.state.as_deref()],
            ", ",
        )
    }

    pub fn profile_image_url(&self) -> String {
        self.picture
            .as_ref()
            .and_then(|p| p.large.clone())
            .unwrap_or_default()
    }

    /// Convert to the canonical record. Profiles without an identity get a
    /// freshly generated one; status always starts out pending.
    pub fn to_match_record(&self) -> MatchRecord {
        let id = self
            .identity()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        MatchRecord {
            id,
            profile_image_url: self.profile_image_url(),
            display_name: self.display_name(),
            address: self.address(),
            status: MatchStatus::Pending,
        }
    }
}

impl RemotePage {
    pub fn to_match_records(&self) -> Vec<MatchRecord> {
        self.results.iter().map(|p| p.to_match_record()).collect()
    }
}
