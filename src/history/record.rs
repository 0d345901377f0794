//! Saved test results and the import report.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::session::scorer::{score, Datapoint};

/// One completed run as it is kept in history.
///
/// Records are immutable once created; the only change history allows is
/// deleting a whole record. `id` is the record's identity for merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResult {
    /// Unique identifier
    pub id: String,

    /// When the run finished (ISO-8601, millisecond precision)
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,

    /// One row per tested frequency
    pub data: Vec<Datapoint>,

    /// System volume level chosen during calibration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_level: Option<u8>,

    /// Headphones or speakers used for the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: Map<String, Value>,
}

impl SavedResult {
    /// Build a record stamped with the current time.
    pub fn new(
        id: String,
        data: Vec<Datapoint>,
        audio_level: Option<u8>,
        device: Option<String>,
    ) -> Self {
        Self {
            id,
            date: now_millis(),
            data,
            audio_level,
            device,
            unknown_fields: Map::new(),
        }
    }

    /// Score of this run
    pub fn score(&self) -> Result<u8> {
        score(&self.data)
    }
}

/// Counts reported by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// Records added to history
    pub imported: usize,
    /// Records rejected as incomplete or already present
    pub skipped: usize,
}

/// The current time truncated to what the stored format keeps.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Serialize dates the way the stored history always has: `2024-03-01T09:30:00.000Z`.
mod iso_millis {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
