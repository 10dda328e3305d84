use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate::{self, Analysis, ConsensusRule, RawParticipant};
use crate::client::PlannerClient;
use crate::models::{AvailabilityStatus, AvailabilityUpdate, SlotConfig, TimeUnit};
use crate::selection::{Phase, Scope, SelectionDraft};
use crate::timekey::{self, TimeKey};

fn print_analysis(analysis: &Analysis) {
    println!("Participants: {}", analysis.summary.total_participants);

    if !analysis.all_available.is_empty() {
        println!(
            "\nEveryone can attend ({} rule):\n",
            analysis.consensus
        );
        for r in &analysis.all_available {
            println!("  {}  {}", r.time_key, r.available_names.join(", "));
        }
    } else if !analysis.best_dates.is_empty() {
        println!(
            "\nBest dates ({} of {} shown):\n",
            analysis.best_dates.len(),
            analysis.summary.best_date_count
        );
        for r in &analysis.best_dates {
            print!("  {}  available: {}", r.time_key, r.available_names.join(", "));
            if !r.maybe_names.is_empty() {
                print!(" / maybe: {}", r.maybe_names.join(", "));
            }
            println!();
        }
    }

    if analysis.results.is_empty() {
        println!("\nNo availability submitted yet.");
        return;
    }

    println!("\nAll results:\n");
    for r in &analysis.results {
        println!(
            "  {:<24} {}/{} responded  available {}  maybe {}  unavailable {}  score {:.1}",
            r.time_key,
            r.responded_count,
            r.total_participants,
            r.available_count,
            r.maybe_count,
            r.unavailable_count,
            r.score
        );
    }
}

/// Aggregate a JSON file of `{ id, nickname, availability }` records without a server.
pub fn run_analyze(
    path: &Path,
    consensus: ConsensusRule,
    best_dates_limit: usize,
    json: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<RawParticipant> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse participants in {}", path.display()))?;
    info!("Analyzing {} participants from {}", records.len(), path.display());

    let results = aggregate::aggregate_raw(&records)
        .with_context(|| format!("Rejected availability data in {}", path.display()))?;
    let analysis = Analysis::new(records.len(), results, consensus, best_dates_limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}

pub fn run_slots(
    from: NaiveDate,
    to: Option<NaiveDate>,
    unit: TimeUnit,
    slot_config: &SlotConfig,
) -> Result<()> {
    let to = to.unwrap_or(from);
    if to < from {
        bail!("--to ({to}) is before --from ({from})");
    }
    let slots = timekey::hour_slots(slot_config.start_hour, slot_config.end_hour);
    for key in timekey::keys_for_range(from, to, unit, &slots) {
        println!("{key}");
    }
    Ok(())
}

pub async fn run_events(server: &str) -> Result<()> {
    let client = PlannerClient::new(server)?;
    let events = client.list_events().await?;
    if events.is_empty() {
        println!("No events on {server}.");
        return Ok(());
    }
    for listing in &events {
        let event = &listing.event;
        println!(
            "  {}  {} ({}, {}/{} participants, by {})",
            event.id,
            event.title,
            event.time_unit,
            listing.participant_count,
            event.max_participants,
            event.creator_name
        );
    }
    Ok(())
}

pub async fn run_results(
    server: &str,
    event_id: Uuid,
    consensus: Option<ConsensusRule>,
    json: bool,
) -> Result<()> {
    let client = PlannerClient::new(server)?;
    let analysis = client.results(event_id, consensus).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        let event = client.get_event(event_id).await?;
        println!("{}\n", event.title);
        print_analysis(&analysis);
    }
    Ok(())
}

/// Hour events edit one date at a time; take it from `--date` or from the keys themselves.
fn resolve_scope(unit: TimeUnit, date: Option<NaiveDate>, keys: &[String]) -> Result<Scope> {
    if let Some(scope) = Scope::for_unit(unit, date) {
        return Ok(scope);
    }
    let mut dates = keys
        .iter()
        .map(|k| TimeKey::parse(k).map(|k| k.date()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    dates.dedup();
    match dates.as_slice() {
        [single] => Ok(Scope::Date(*single)),
        [] => bail!("Hour events need --date or at least one time-key"),
        _ => bail!("Hour events are edited one date at a time; pass --date"),
    }
}

pub struct MarkRequest<'a> {
    pub event_id: Uuid,
    pub participant_id: Uuid,
    pub status: AvailabilityStatus,
    pub date: Option<NaiveDate>,
    pub keys: &'a [String],
    pub dry_run: bool,
}

/// Toggle `keys` in a participant's `status` selection and upload the merged map.
pub async fn run_mark(server: &str, request: MarkRequest<'_>) -> Result<()> {
    let client = PlannerClient::new(server)?;
    let event = client.get_event(request.event_id).await?;
    let participant = client
        .participants(request.event_id)
        .await?
        .into_iter()
        .find(|p| p.id == request.participant_id)
        .with_context(|| {
            format!(
                "Participant {} is not part of event {}",
                request.participant_id, request.event_id
            )
        })?;

    let scope = resolve_scope(event.time_unit, request.date, request.keys)?;
    let mut draft = SelectionDraft::new(participant.availability.clone());
    draft.begin(request.status, scope)?;
    for key in request.keys {
        if draft.toggle(key)? {
            info!("{}: marked {} as {}", participant.nickname, key, draft.mode());
        } else {
            info!("{}: cleared {} from {}", participant.nickname, key, draft.mode());
        }
    }
    if !draft.is_dirty() {
        warn!("Nothing to change for {}", participant.nickname);
        return Ok(());
    }

    if request.dry_run {
        println!(
            "[DRY RUN] Would save {} {} keys for {}:",
            draft.selected().len(),
            draft.mode(),
            participant.nickname
        );
        for (key, status) in &draft.preview() {
            println!("  {key}  {status}");
        }
        draft.reset()?;
        return Ok(());
    }

    let merged = draft.save()?;
    let update = AvailabilityUpdate::from_map(participant.id, &merged);
    match client.save_availability(&update).await {
        Ok(saved) => {
            println!(
                "Saved {} entries for {}",
                saved.availability.len(),
                saved.nickname
            );
            draft.complete(saved.availability)?;
            Ok(())
        }
        Err(e) => {
            draft.fail(format!("{e:#}"))?;
            if let Phase::Error(message) = draft.phase() {
                warn!("Selection for {} not saved: {}", participant.nickname, message);
            }
            Err(e)
        }
    }
}
