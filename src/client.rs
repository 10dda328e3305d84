use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::aggregate::{Analysis, ConsensusRule};
use crate::models::{AvailabilityUpdate, Event, EventListing, Participant};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:3009";

const CLIENT_UA: &str = concat!("meetup-planner/", env!("CARGO_PKG_VERSION"));

/// Talks to a running planner server's JSON API.
pub struct PlannerClient {
    client: Client,
    base: String,
}

impl PlannerClient {
    pub fn new(base: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_UA));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn event_url(&self, event_id: Uuid, suffix: &str) -> String {
        format!("{}/api/events/{}{}", self.base, event_id, suffix)
    }

    /// Send a request and decode the JSON body, surfacing the server's `error` field on failure.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to send {what} request"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("Failed to read {what} response"))?;
        debug!("{} response (status {}): {}", what, status, text);

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(text);
            bail!("{what} failed (status {status}): {message}");
        }

        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {what} response (status {status}): {text}"))
    }

    pub async fn list_events(&self) -> Result<Vec<EventListing>> {
        let url = format!("{}/api/events", self.base);
        self.fetch(self.client.get(&url), "events").await
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<Event> {
        let url = self.event_url(event_id, "");
        self.fetch(self.client.get(&url), "event").await
    }

    pub async fn participants(&self, event_id: Uuid) -> Result<Vec<Participant>> {
        let url = self.event_url(event_id, "/participants");
        self.fetch(self.client.get(&url), "participants").await
    }

    pub async fn results(
        &self,
        event_id: Uuid,
        consensus: Option<ConsensusRule>,
    ) -> Result<Analysis> {
        let mut url = self.event_url(event_id, "/results");
        if let Some(rule) = consensus {
            url.push_str(&format!("?consensus={rule}"));
        }
        self.fetch(self.client.get(&url), "results").await
    }

    pub async fn save_availability(&self, update: &AvailabilityUpdate) -> Result<Participant> {
        let url = format!("{}/api/availability", self.base);
        self.fetch(self.client.post(&url).json(update), "availability")
            .await
    }
}
