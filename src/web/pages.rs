use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::response::Html;
use chrono::NaiveDate;
use uuid::Uuid;

use super::error::AppError;
use super::views::{render_dashboard, render_event_page, EventPage};
use super::AppState;
use crate::aggregate::{self, DayHeat};
use crate::models::{Participant, TimeUnit};
use crate::timekey::{self, TimeKey};

fn now_string(state: &AppState) -> String {
    timekey::now(state.tz)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

pub(crate) async fn dashboard_handler(State(state): State<AppState>) -> Html<String> {
    let events = state.store.list_events();
    Html(render_dashboard(&events, state.tz, now_string(&state)))
}

/// Every answered date, oldest first, with its calendar heat.
fn heat_rows(participants: &[Participant], unit: TimeUnit) -> Vec<(NaiveDate, Option<DayHeat>)> {
    let dates: BTreeSet<NaiveDate> = participants
        .iter()
        .flat_map(|p| p.availability.keys())
        .filter_map(|key| TimeKey::parse(key).ok())
        .map(|key| key.date())
        .collect();
    dates
        .into_iter()
        .map(|date| (date, aggregate::day_heat(participants, date, unit)))
        .collect()
}

pub(crate) async fn event_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let event = state.store.get_event(id)?;
    let participants = state.store.participants(id)?;
    let analysis = aggregate::analyze(
        &participants,
        state.config.results.consensus,
        state.config.results.best_dates_limit,
    )?;
    let heat = heat_rows(&participants, event.time_unit);

    let page = EventPage {
        event: &event,
        participants: &participants,
        analysis: &analysis,
        heat: &heat,
    };
    Ok(Html(render_event_page(&page, state.tz, now_string(&state))))
}
