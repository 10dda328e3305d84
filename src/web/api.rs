use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::error::AppError;
use super::AppState;
use crate::aggregate::{self, Analysis, ConsensusRule};
use crate::models::{AvailabilityUpdate, Event, EventListing, NewEvent, NewParticipant, Participant};

pub(crate) async fn list_events(State(state): State<AppState>) -> Json<Vec<EventListing>> {
    Json(state.store.list_events())
}

pub(crate) async fn create_event(
    State(state): State<AppState>,
    Json(new): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let (event, _creator) = state.store.create_event(new)?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub(crate) async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(state.store.get_event(id)?))
}

pub(crate) async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Participant>>, AppError> {
    Ok(Json(state.store.participants(id)?))
}

pub(crate) async fn join_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(new): Json<NewParticipant>,
) -> Result<(StatusCode, Json<Participant>), AppError> {
    let participant = state.store.join(id, new)?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub(crate) async fn save_availability(
    State(state): State<AppState>,
    Json(update): Json<AvailabilityUpdate>,
) -> Result<Json<Participant>, AppError> {
    Ok(Json(state.store.replace_availability(&update)?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultsQuery {
    consensus: Option<ConsensusRule>,
}

pub(crate) async fn event_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Analysis>, AppError> {
    let participants = state.store.participants(id)?;
    let consensus = query.consensus.unwrap_or(state.config.results.consensus);
    let analysis = aggregate::analyze(
        &participants,
        consensus,
        state.config.results.best_dates_limit,
    )?;
    debug!(
        "Results for {}: {} time-keys, {} with consensus",
        id,
        analysis.results.len(),
        analysis.summary.all_available_count
    );
    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::models::Config;
    use crate::store::Store;
    use crate::web::{router, AppState};

    fn app() -> Router {
        router(AppState::new(Config::default(), Store::in_memory()).unwrap())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_event(app: &Router, max: u32) -> Value {
        let (status, event) = send(
            app,
            "POST",
            "/api/events",
            Some(json!({
                "title": "Weekend meetup",
                "description": "Pick a date",
                "timeUnit": "day",
                "maxParticipants": max,
                "creatorName": "Alice",
                "creatorColor": "#8B5CF6"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        event
    }

    #[tokio::test]
    async fn test_create_join_mark_and_rank() {
        let app = app();
        let event = create_event(&app, 3).await;
        let id = event["id"].as_str().unwrap();

        let (status, bob) = send(
            &app,
            "POST",
            &format!("/api/events/{id}/participants"),
            Some(json!({ "name": "Bob", "color": "#FBCFE8" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, participants) = send(&app, "GET", &format!("/api/events/{id}/participants"), None).await;
        let alice_id = participants[0]["id"].as_str().unwrap().to_string();
        assert_eq!(participants[0]["nickname"], "Alice");

        for (pid, entries) in [
            (
                alice_id.as_str(),
                json!([
                    { "dateTime": "2024-01-20", "status": "available" },
                    { "dateTime": "2024-01-21", "status": "maybe" }
                ]),
            ),
            (
                bob["id"].as_str().unwrap(),
                json!([
                    { "dateTime": "2024-01-20", "status": "available" },
                    { "dateTime": "2024-01-21", "status": "available" }
                ]),
            ),
        ] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/availability",
                Some(json!({ "participantId": pid, "availability": entries })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, analysis) = send(&app, "GET", &format!("/api/events/{id}/results"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analysis["summary"]["totalParticipants"], 2);
        assert_eq!(analysis["results"][0]["timeKey"], "2024-01-20");
        assert_eq!(analysis["results"][0]["score"], 2.0);
        assert_eq!(analysis["results"][1]["score"], 1.5);
        assert_eq!(analysis["allAvailable"][0]["timeKey"], "2024-01-20");
        assert_eq!(analysis["consensus"], "everyone");

        let (_, listing) = send(&app, "GET", "/api/events", None).await;
        assert_eq!(listing[0]["participantCount"], 2);
    }

    #[tokio::test]
    async fn test_consensus_query_override() {
        let app = app();
        let event = create_event(&app, 3).await;
        let id = event["id"].as_str().unwrap();
        send(
            &app,
            "POST",
            &format!("/api/events/{id}/participants"),
            Some(json!({ "name": "Bob", "color": "#FBCFE8" })),
        )
        .await;
        let (_, participants) = send(&app, "GET", &format!("/api/events/{id}/participants"), None).await;
        let alice_id = participants[0]["id"].as_str().unwrap();
        send(
            &app,
            "POST",
            "/api/availability",
            Some(json!({
                "participantId": alice_id,
                "availability": [{ "dateTime": "2024-01-20", "status": "available" }]
            })),
        )
        .await;

        let (_, strict) = send(&app, "GET", &format!("/api/events/{id}/results"), None).await;
        assert_eq!(strict["allAvailable"], json!([]));
        assert_eq!(strict["bestDates"][0]["timeKey"], "2024-01-20");

        let (_, lenient) = send(
            &app,
            "GET",
            &format!("/api/events/{id}/results?consensus=respondents"),
            None,
        )
        .await;
        assert_eq!(lenient["allAvailable"][0]["timeKey"], "2024-01-20");
        assert_eq!(lenient["bestDates"], json!([]));
    }

    #[tokio::test]
    async fn test_full_event_conflicts() {
        let app = app();
        let event = create_event(&app, 1).await;
        let id = event["id"].as_str().unwrap();
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/events/{id}/participants"),
            Some(json!({ "name": "Bob", "color": "#FBCFE8" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("full"));
    }

    #[tokio::test]
    async fn test_invalid_availability_is_unprocessable() {
        let app = app();
        let event = create_event(&app, 3).await;
        let id = event["id"].as_str().unwrap();
        let (_, participants) = send(&app, "GET", &format!("/api/events/{id}/participants"), None).await;
        let alice_id = participants[0]["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/api/availability",
            Some(json!({
                "participantId": alice_id,
                "availability": [{ "dateTime": "2024-01-20", "status": "pending" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("pending"));
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let app = app();
        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/events/{}/results", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
