//! Recording sessions: subject metadata that groups stored blocks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the storage engine to a session
pub type SessionId = i64;

/// Subject metadata supplied when a recording session starts.
///
/// Accepts the Spanish field names sent by the existing web client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default, alias = "nombre")]
    pub first_name: String,
    #[serde(default, alias = "apellido")]
    pub last_name: String,
    #[serde(default, alias = "actividad")]
    pub activity: String,
}

impl SessionRequest {
    /// Display name `session_<first>_<last>_<activity>_<YYYYmmdd_HHMMSS>`.
    ///
    /// Only alphanumerics, spaces and underscores survive from each field.
    pub fn session_name(&self, started_at: DateTime<Utc>) -> String {
        format!(
            "session_{}_{}_{}_{}",
            clean_field(&self.first_name, "no_name"),
            clean_field(&self.last_name, "no_surname"),
            clean_field(&self.activity, "no_activity"),
            started_at.format("%Y%m%d_%H%M%S")
        )
    }
}

fn clean_field(value: &str, fallback: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Stored recording session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub activity: String,
    pub started_at: DateTime<Utc>,
}
