use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::ConsensusRule;
use crate::error::ValidationError;
use crate::timekey;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub slots: SlotConfig,
    pub results: ResultsConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Snapshot file; the store stays in memory when unset.
    pub data_file: Option<PathBuf>,
    pub timezone: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3009".to_string(),
            data_file: None,
            timezone: "UTC".to_string(),
        }
    }
}

/// First and last start hour of the selectable hour slots.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SlotConfig {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            start_hour: timekey::DEFAULT_START_HOUR,
            end_hour: timekey::DEFAULT_END_HOUR,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub consensus: ConsensusRule,
    pub best_dates_limit: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            consensus: ConsensusRule::default(),
            best_dates_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    #[serde(alias = "time")]
    Hour,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
        })
    }
}

impl FromStr for TimeUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(TimeUnit::Day),
            "hour" | "time" => Ok(TimeUnit::Hour),
            _ => Err(ValidationError::UnknownTimeUnit(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AvailabilityStatus {
    Available,
    Unavailable,
    Maybe,
}

impl AvailabilityStatus {
    pub const ALL: [AvailabilityStatus; 3] = [
        AvailabilityStatus::Available,
        AvailabilityStatus::Unavailable,
        AvailabilityStatus::Maybe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Unavailable => "unavailable",
            AvailabilityStatus::Maybe => "maybe",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for AvailabilityStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Time-key → status. Ordered so serialized snapshots are stable.
pub type Availability = BTreeMap<String, AvailabilityStatus>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_unit: TimeUnit,
    pub max_participants: u32,
    pub creator_name: String,
    pub creator_color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListing {
    #[serde(flatten)]
    pub event: Event,
    pub participant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub nickname: String,
    pub color: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub availability: Availability,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_unit: TimeUnit,
    pub max_participants: u32,
    pub creator_name: String,
    pub creator_color: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewParticipant {
    pub name: String,
    pub color: String,
}

/// One availability row as submitted by a client; the status is checked by the store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    pub date_time: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityUpdate {
    pub participant_id: Uuid,
    pub availability: Vec<AvailabilityEntry>,
}

impl AvailabilityUpdate {
    pub fn from_map(participant_id: Uuid, availability: &Availability) -> Self {
        Self {
            participant_id,
            availability: availability
                .iter()
                .map(|(key, status)| AvailabilityEntry {
                    date_time: key.clone(),
                    status: status.to_string(),
                })
                .collect(),
        }
    }
}

/// Accepts `#RRGGBB` (case-insensitive).
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor(color.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("maybe".parse(), Ok(AvailabilityStatus::Maybe));
        assert_eq!(
            "pending".parse::<AvailabilityStatus>(),
            Err(ValidationError::UnknownStatus("pending".into()))
        );
    }

    #[test]
    fn test_status_serde_rejects_unknown() {
        let ok: AvailabilityStatus = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(ok, AvailabilityStatus::Unavailable);
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"unavailable\"");

        let err = serde_json::from_str::<AvailabilityStatus>("\"pending\"").unwrap_err();
        assert!(err.to_string().contains("unknown availability status"));
    }

    #[test]
    fn test_time_unit_accepts_legacy_time_alias() {
        assert_eq!("time".parse(), Ok(TimeUnit::Hour));
        assert_eq!("Day".parse(), Ok(TimeUnit::Day));
        assert!("week".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#8B5CF6").is_ok());
        assert!(validate_color("#a5d8e6").is_ok());
        assert!(validate_color("8B5CF6").is_err());
        assert!(validate_color("#FFF").is_err());
        assert!(validate_color("#GGGGGG").is_err());
    }

    #[test]
    fn test_config_defaults_fill_missing_sections() {
        let cfg: Config = toml::from_str("[server]\naddr = \"127.0.0.1:8080\"\n").unwrap();
        assert_eq!(cfg.server.addr, "127.0.0.1:8080");
        assert_eq!(cfg.server.timezone, "UTC");
        assert_eq!(cfg.slots.start_hour, 9);
        assert_eq!(cfg.slots.end_hour, 22);
        assert_eq!(cfg.results.best_dates_limit, 5);
        assert_eq!(cfg.results.consensus, ConsensusRule::Everyone);
    }
}
