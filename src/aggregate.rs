//! Availability aggregation.
//!
//! Turns every participant's time-key → status map into one [`AggregatedResult`]
//! per time-key, ranked by a score that counts a "maybe" as half an "available".
//! The aggregator is a pure function over a snapshot: it never mutates its input
//! and recomputes everything on each call.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::models::{AvailabilityStatus, Participant, TimeUnit};
use crate::timekey::TimeKey;

/// Tally of one time-key across all participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub time_key: String,
    pub available_count: usize,
    pub unavailable_count: usize,
    pub maybe_count: usize,
    pub responded_count: usize,
    pub total_participants: usize,
    pub available_names: Vec<String>,
    pub unavailable_names: Vec<String>,
    pub maybe_names: Vec<String>,
    pub score: f64,
}

/// A participant as handed over by a data source that stores statuses as free text.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawParticipant {
    #[serde(default)]
    pub id: String,
    pub nickname: String,
    #[serde(default)]
    pub availability: BTreeMap<String, String>,
}

#[derive(Default)]
struct Buckets<'a> {
    available: Vec<&'a str>,
    unavailable: Vec<&'a str>,
    maybe: Vec<&'a str>,
}

impl<'a> Buckets<'a> {
    fn push(&mut self, status: AvailabilityStatus, name: &'a str) {
        match status {
            AvailabilityStatus::Available => self.available.push(name),
            AvailabilityStatus::Unavailable => self.unavailable.push(name),
            AvailabilityStatus::Maybe => self.maybe.push(name),
        }
    }

    fn into_result(self, time_key: &str, total_participants: usize) -> AggregatedResult {
        let owned = |names: Vec<&str>| names.into_iter().map(str::to_string).collect::<Vec<_>>();
        let available_count = self.available.len();
        let unavailable_count = self.unavailable.len();
        let maybe_count = self.maybe.len();
        AggregatedResult {
            time_key: time_key.to_string(),
            available_count,
            unavailable_count,
            maybe_count,
            responded_count: available_count + unavailable_count + maybe_count,
            total_participants,
            available_names: owned(self.available),
            unavailable_names: owned(self.unavailable),
            maybe_names: owned(self.maybe),
            score: score(available_count, maybe_count),
        }
    }
}

pub fn score(available: usize, maybe: usize) -> f64 {
    available as f64 + 0.5 * maybe as f64
}

/// Rank every time-key any participant answered.
///
/// Keys are validated up front, so a malformed key fails the whole call
/// instead of producing a partial ranking. Results are sorted by descending
/// score; equal scores are ordered by ascending time-key, which for ISO keys is
/// chronological order and does not depend on the order of `participants`.
pub fn aggregate(participants: &[Participant]) -> Result<Vec<AggregatedResult>> {
    let mut responses = Vec::new();
    for participant in participants {
        for (key, status) in &participant.availability {
            TimeKey::parse(key)?;
            responses.push((participant.nickname.as_str(), key.as_str(), *status));
        }
    }
    Ok(tally(participants.len(), responses))
}

/// Same as [`aggregate`], for records whose statuses have not been checked yet.
/// Any status outside `available | unavailable | maybe` rejects the whole input.
pub fn aggregate_raw(records: &[RawParticipant]) -> Result<Vec<AggregatedResult>> {
    let mut responses = Vec::new();
    for record in records {
        for (key, status) in &record.availability {
            let status: AvailabilityStatus = status.parse()?;
            TimeKey::parse(key)?;
            responses.push((record.nickname.as_str(), key.as_str(), status));
        }
    }
    Ok(tally(records.len(), responses))
}

fn tally<'a>(
    total_participants: usize,
    responses: impl IntoIterator<Item = (&'a str, &'a str, AvailabilityStatus)>,
) -> Vec<AggregatedResult> {
    let mut by_key: BTreeMap<&str, Buckets<'_>> = BTreeMap::new();
    for (name, key, status) in responses {
        by_key.entry(key).or_default().push(status, name);
    }

    let mut results: Vec<AggregatedResult> = by_key
        .into_iter()
        .map(|(key, buckets)| buckets.into_result(key, total_participants))
        .collect();
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.time_key.cmp(&b.time_key))
    });
    results
}

/// What "everyone can attend" means for a time-key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusRule {
    /// Every current participant answered `available`. Someone who has not
    /// answered blocks consensus, so a growing roster never overstates it.
    #[default]
    Everyone,
    /// Everyone who answered said `available`; non-responders are ignored.
    Respondents,
}

impl ConsensusRule {
    pub fn admits(self, result: &AggregatedResult) -> bool {
        match self {
            ConsensusRule::Everyone => {
                result.total_participants > 0
                    && result.available_count == result.total_participants
            }
            ConsensusRule::Respondents => {
                result.responded_count > 0 && result.available_count == result.responded_count
            }
        }
    }
}

impl fmt::Display for ConsensusRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConsensusRule::Everyone => "everyone",
            ConsensusRule::Respondents => "respondents",
        })
    }
}

impl FromStr for ConsensusRule {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "everyone" => Ok(ConsensusRule::Everyone),
            "respondents" => Ok(ConsensusRule::Respondents),
            _ => Err(ValidationError::UnknownConsensusRule(s.to_string())),
        }
    }
}

pub fn all_available(results: &[AggregatedResult], rule: ConsensusRule) -> Vec<&AggregatedResult> {
    results.iter().filter(|r| rule.admits(r)).collect()
}

/// Time-keys sharing the highest `available_count`, in ranking order.
pub fn best_dates(results: &[AggregatedResult]) -> Vec<&AggregatedResult> {
    let Some(max) = results.iter().map(|r| r.available_count).max() else {
        return Vec::new();
    };
    results.iter().filter(|r| r.available_count == max).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_participants: usize,
    pub all_available_count: usize,
    pub best_date_count: usize,
}

/// Everything the results view shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: Summary,
    pub consensus: ConsensusRule,
    pub results: Vec<AggregatedResult>,
    pub all_available: Vec<AggregatedResult>,
    /// Only filled when no time-key reaches consensus; capped at the configured limit.
    pub best_dates: Vec<AggregatedResult>,
}

impl Analysis {
    pub fn new(
        total_participants: usize,
        results: Vec<AggregatedResult>,
        consensus: ConsensusRule,
        best_dates_limit: usize,
    ) -> Self {
        let all: Vec<AggregatedResult> = all_available(&results, consensus)
            .into_iter()
            .cloned()
            .collect();
        let best = best_dates(&results);
        let summary = Summary {
            total_participants,
            all_available_count: all.len(),
            best_date_count: best.len(),
        };
        let best_dates = if all.is_empty() {
            best.into_iter().take(best_dates_limit).cloned().collect()
        } else {
            Vec::new()
        };
        Self {
            summary,
            consensus,
            results,
            all_available: all,
            best_dates,
        }
    }
}

pub fn analyze(
    participants: &[Participant],
    consensus: ConsensusRule,
    best_dates_limit: usize,
) -> Result<Analysis> {
    let results = aggregate(participants)?;
    Ok(Analysis::new(
        participants.len(),
        results,
        consensus,
        best_dates_limit,
    ))
}

/// Calendar-cell summary for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayHeat {
    AllAvailable,
    MostAvailable,
    SomeAvailable,
    NoneAvailable,
}

impl DayHeat {
    pub fn css_class(self) -> &'static str {
        match self {
            DayHeat::AllAvailable => "heat-all",
            DayHeat::MostAvailable => "heat-most",
            DayHeat::SomeAvailable => "heat-some",
            DayHeat::NoneAvailable => "heat-none",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayHeat::AllAvailable => "all available",
            DayHeat::MostAvailable => "most available",
            DayHeat::SomeAvailable => "some available",
            DayHeat::NoneAvailable => "none available",
        }
    }
}

/// Share of `available` among all stored responses on `date` (every stored
/// slot of the day for hour events, configured or not). `None` when nobody
/// answered anything that day.
pub fn day_heat(
    participants: &[Participant],
    date: NaiveDate,
    unit: TimeUnit,
) -> Option<DayHeat> {
    let statuses: Vec<AvailabilityStatus> = participants
        .iter()
        .flat_map(|p| p.availability.iter())
        .filter(|(key, _)| {
            TimeKey::parse(key).is_ok_and(|key| key.date() == date && key.unit() == unit)
        })
        .map(|(_, status)| *status)
        .collect();
    if statuses.is_empty() {
        return None;
    }

    let total = statuses.len();
    let available = statuses
        .iter()
        .filter(|s| **s == AvailabilityStatus::Available)
        .count();
    Some(if available == total {
        DayHeat::AllAvailable
    } else if available * 2 > total {
        DayHeat::MostAvailable
    } else if available > 0 {
        DayHeat::SomeAvailable
    } else {
        DayHeat::NoneAvailable
    })
}
