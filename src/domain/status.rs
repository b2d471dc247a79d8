use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    Active,
    Inactive,
    #[default]
    Unknown,
}

const ACTIVE_ALIASES: [&str; 6] = ["active", "published", "actual", "open", "активно", "опубликовано"];
const INACTIVE_ALIASES: [&str; 9] = ["inactive", "removed", "closed", "archived", "sold", "deleted", "expired", "снято", "продано"];

impl AdStatus {
    /// Case-insensitive interpretation of a free-form status label.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if ACTIVE_ALIASES.contains(&label.as_str()) {
            Self::Active
        } else if INACTIVE_ALIASES.contains(&label.as_str()) {
            Self::Inactive
        } else {
            Self::Unknown
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Self::Active,
            Value::Bool(false) => Self::Inactive,
            Value::String(label) => Self::from_label(label),
            _ => Self::Unknown,
        }
    }

    /// Lenient conversion of a stored value; unexpected labels become `Unknown`.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::warn!("unexpected ad status in the database: {value}");
            Self::Unknown
        })
    }
}
