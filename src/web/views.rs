use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use leptos::prelude::*;

use crate::aggregate::{AggregatedResult, Analysis, DayHeat};
use crate::models::{AvailabilityStatus, Event, EventListing, Participant};
use crate::timekey::TimeKey;

const STYLE: &str = include_str!("../style.css");

pub(super) fn format_time_key(key: &str) -> String {
    match TimeKey::parse(key) {
        Ok(TimeKey::Day(date)) => date.format("%a, %b %-d %Y").to_string(),
        Ok(TimeKey::Slot { date, start, end }) => format!(
            "{} {}-{}",
            date.format("%a, %b %-d %Y"),
            start.format("%H:%M"),
            end.format("%H:%M")
        ),
        Err(_) => key.to_string(),
    }
}

fn format_timestamp(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn page(title: String, now: String, body_html: String) -> String {
    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <title>{title.clone()}</title>
                <style>{STYLE}</style>
            </head>
            <body>
                <h1>{title}</h1>
                <p class="timestamp">"Updated: " {now}</p>
                <div inner_html=body_html />
            </body>
        </html>
    }
    .to_html()
}

pub(super) fn render_dashboard(events: &[EventListing], tz: Tz, now: String) -> String {
    let events_html = render_events_table(events, tz);
    let body = view! {
        <section>
            <h2>"Events"</h2>
            <div inner_html=events_html />
        </section>
    }
    .to_html();
    page("Meetup Planner".to_string(), now, body)
}

fn render_events_table(events: &[EventListing], tz: Tz) -> String {
    if events.is_empty() {
        return view! { <p class="empty">"No events yet."</p> }.to_html();
    }

    let rows_html: String = events
        .iter()
        .map(|listing| {
            let event = &listing.event;
            let href = format!("/event/{}", event.id);
            let title = event.title.clone();
            let unit = event.time_unit.to_string();
            let count = format!("{}/{}", listing.participant_count, event.max_participants);
            let css = if listing.participant_count >= event.max_participants as usize {
                "capacity full"
            } else {
                "capacity available"
            }
            .to_string();
            let creator = event.creator_name.clone();
            let created = format_timestamp(event.created_at, tz);

            view! {
                <tr>
                    <td><a href=href>{title}</a></td>
                    <td>{unit}</td>
                    <td class=css>{count}</td>
                    <td>{creator}</td>
                    <td>{created}</td>
                </tr>
            }
            .to_html()
        })
        .collect();

    view! {
        <table>
            <thead>
                <tr>
                    <th>"Title"</th>
                    <th>"Unit"</th>
                    <th>"Participants"</th>
                    <th>"Created By"</th>
                    <th>"Created"</th>
                </tr>
            </thead>
            <tbody inner_html=rows_html />
        </table>
    }
    .to_html()
}

pub(super) struct EventPage<'a> {
    pub(super) event: &'a Event,
    pub(super) participants: &'a [Participant],
    pub(super) analysis: &'a Analysis,
    pub(super) heat: &'a [(NaiveDate, Option<DayHeat>)],
}

pub(super) fn render_event_page(data: &EventPage<'_>, tz: Tz, now: String) -> String {
    let event = data.event;
    let description = event.description.clone();
    let info = format!(
        "{} participants of {} · {} granularity · created by {} on {}",
        data.participants.len(),
        event.max_participants,
        event.time_unit,
        event.creator_name,
        format_timestamp(event.created_at, tz)
    );
    let summary_html = render_summary(data.analysis);
    let highlight_html = render_highlight(data.analysis);
    let participants_html = render_participants_table(data.participants);
    let heat_html = render_heat_table(data.heat);
    let results_html = render_results_table(&data.analysis.results);

    let body = view! {
        <p class="description">{description}</p>
        <p class="event-info">{info}</p>
        <div inner_html=summary_html />
        <div inner_html=highlight_html />
        <section>
            <h2>"Participants"</h2>
            <div inner_html=participants_html />
        </section>
        <section>
            <h2>"Calendar Overview"</h2>
            <div inner_html=heat_html />
        </section>
        <section>
            <h2>"All Results"</h2>
            <div inner_html=results_html />
        </section>
    }
    .to_html();
    page(event.title.clone(), now, body)
}

fn render_summary(analysis: &Analysis) -> String {
    let total = analysis.summary.total_participants.to_string();
    let all = analysis.summary.all_available_count.to_string();
    let best = analysis.summary.best_date_count.to_string();
    let rule = analysis.consensus.to_string();

    view! {
        <section class="summary">
            <div class="card"><h3>"Participants"</h3><p>{total}</p></div>
            <div class="card all"><h3>"Everyone Can Attend"</h3><p>{all}</p><small>{rule}</small></div>
            <div class="card best"><h3>"Best Dates"</h3><p>{best}</p></div>
        </section>
    }
    .to_html()
}

fn render_highlight(analysis: &Analysis) -> String {
    if !analysis.all_available.is_empty() {
        let rows: String = analysis
            .all_available
            .iter()
            .map(|r| {
                let when = format_time_key(&r.time_key);
                let names = r.available_names.join(", ");
                let badge = format!("{} available", r.available_count);
                view! {
                    <li class="status-all">
                        <strong>{when}</strong>
                        " " <span class="names">{names}</span>
                        " " <span class="badge">{badge}</span>
                    </li>
                }
                .to_html()
            })
            .collect();
        return view! {
            <section>
                <h2>"Dates Everyone Can Attend"</h2>
                <ul class="highlight" inner_html=rows />
            </section>
        }
        .to_html();
    }

    if analysis.best_dates.is_empty() {
        return view! { <p class="empty">"No availability submitted yet."</p> }.to_html();
    }

    let rows: String = analysis
        .best_dates
        .iter()
        .map(|r| {
            let when = format_time_key(&r.time_key);
            let mut names = format!("available: {}", r.available_names.join(", "));
            if !r.maybe_names.is_empty() {
                names.push_str(&format!(" / maybe: {}", r.maybe_names.join(", ")));
            }
            let badge = format!("{} available", r.available_count);
            view! {
                <li class="status-best">
                    <strong>{when}</strong>
                    " " <span class="names">{names}</span>
                    " " <span class="badge">{badge}</span>
                </li>
            }
            .to_html()
        })
        .collect();
    view! {
        <section>
            <h2>"Best Dates"</h2>
            <ul class="highlight" inner_html=rows />
        </section>
    }
    .to_html()
}

fn render_participants_table(participants: &[Participant]) -> String {
    if participants.is_empty() {
        return view! { <p class="empty">"Nobody has joined yet."</p> }.to_html();
    }

    let rows_html: String = participants
        .iter()
        .map(|p| {
            let count = |status: AvailabilityStatus| {
                p.availability
                    .values()
                    .filter(|s| **s == status)
                    .count()
                    .to_string()
            };
            let swatch = format!("background-color: {}", p.color);
            let name = p.nickname.clone();
            let available = count(AvailabilityStatus::Available);
            let maybe = count(AvailabilityStatus::Maybe);
            let unavailable = count(AvailabilityStatus::Unavailable);

            view! {
                <tr>
                    <td><span class="swatch" style=swatch></span>{name}</td>
                    <td class="status-available">{available}</td>
                    <td class="status-maybe">{maybe}</td>
                    <td class="status-unavailable">{unavailable}</td>
                </tr>
            }
            .to_html()
        })
        .collect();

    view! {
        <table>
            <thead>
                <tr><th>"Name"</th><th>"Available"</th><th>"Maybe"</th><th>"Unavailable"</th></tr>
            </thead>
            <tbody inner_html=rows_html />
        </table>
    }
    .to_html()
}

fn render_heat_table(heat: &[(NaiveDate, Option<DayHeat>)]) -> String {
    if heat.is_empty() {
        return view! { <p class="empty">"No dates answered yet."</p> }.to_html();
    }

    let rows_html: String = heat
        .iter()
        .map(|(date, level)| {
            let day = date.format("%a, %b %-d %Y").to_string();
            let (css, label) = match level {
                Some(level) => (level.css_class().to_string(), level.label().to_string()),
                None => ("heat-empty".to_string(), "no responses".to_string()),
            };
            view! {
                <tr>
                    <td>{day}</td>
                    <td class=css>{label}</td>
                </tr>
            }
            .to_html()
        })
        .collect();

    view! {
        <table>
            <thead>
                <tr><th>"Date"</th><th>"Availability"</th></tr>
            </thead>
            <tbody inner_html=rows_html />
        </table>
    }
    .to_html()
}

fn render_results_table(results: &[AggregatedResult]) -> String {
    if results.is_empty() {
        return view! { <p class="empty">"No results yet."</p> }.to_html();
    }

    let rows_html: String = results
        .iter()
        .map(|r| {
            let when = format_time_key(&r.time_key);
            let responded = format!("{}/{}", r.responded_count, r.total_participants);
            let available = r.available_count.to_string();
            let maybe = r.maybe_count.to_string();
            let unavailable = r.unavailable_count.to_string();
            let score = format!("{:.1}", r.score);

            view! {
                <tr>
                    <td>{when}</td>
                    <td>{responded}</td>
                    <td class="status-available">{available}</td>
                    <td class="status-maybe">{maybe}</td>
                    <td class="status-unavailable">{unavailable}</td>
                    <td>{score}</td>
                </tr>
            }
            .to_html()
        })
        .collect();

    view! {
        <table>
            <thead>
                <tr>
                    <th>"When"</th>
                    <th>"Responded"</th>
                    <th>"Available"</th>
                    <th>"Maybe"</th>
                    <th>"Unavailable"</th>
                    <th>"Score"</th>
                </tr>
            </thead>
            <tbody inner_html=rows_html />
        </table>
    }
    .to_html()
}
