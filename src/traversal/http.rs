//! HTTP transport for the upstream explainer service
//!
//! POSTs JSON to the explainer's endpoint paths and decodes JSON answers.
//! Transport failures, non-success statuses, and undecodable bodies all
//! surface as `UpstreamError`; the caller decides what to do (the core
//! never retries).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;
use crate::observability::Logger;

use super::errors::{UpstreamError, UpstreamResult};
use super::upstream::Upstream;
use super::{HistoryFilters, ProbabilityMap, TimeWindow};

/// HTTP upstream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpUpstreamConfig {
    /// Base URL of the explainer service, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpUpstreamConfig {
    /// Configuration with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `Upstream` implementation over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    config: HttpUpstreamConfig,
    client: reqwest::Client,
}

/// Event-set request body shared by the traversal primitives.
#[derive(Debug, Serialize)]
struct EventsRequest<'a> {
    events: &'a [Event],
    #[serde(flatten)]
    window: TimeWindow,
}

/// Request body for the hydration primitives.
#[derive(Debug, Serialize)]
struct FillRequest<'a> {
    events: &'a [Event],
    topic: &'a str,
    #[serde(rename = "valueHash")]
    value_hash: &'a str,
    #[serde(flatten)]
    window: TimeWindow,
}

/// Hydration answers carry either one event or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Box<Event>),
    Many(Vec<Event>),
}

impl From<OneOrMany> for Vec<Event> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(event) => vec![*event],
            OneOrMany::Many(events) => events,
        }
    }
}

impl HttpUpstream {
    /// Builds the client for the given configuration.
    pub fn new(config: HttpUpstreamConfig) -> UpstreamResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> UpstreamResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                Logger::error("UPSTREAM_TRANSPORT_FAILED", &[("endpoint", endpoint)]);
                UpstreamError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            Logger::error(
                "UPSTREAM_STATUS",
                &[("endpoint", endpoint), ("status", status.as_str())],
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| UpstreamError::Malformed(format!("{}: {}", endpoint, e)))
    }
}

impl Upstream for HttpUpstream {
    async fn fingerprint(&self, value: &Value) -> UpstreamResult<String> {
        self.post("/value_to_hash", value).await
    }

    async fn possible_effects(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        self.post("/possible_effects", &EventsRequest { events, window })
            .await
    }

    async fn possible_causes(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        self.post("/possible_causes", &EventsRequest { events, window })
            .await
    }

    async fn effects_of(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.post("/effects_of", &EventsRequest { events, window })
            .await
    }

    async fn causes_of(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.post("/causes_of", &EventsRequest { events, window })
            .await
    }

    async fn fill_effect(
        &self,
        causes: &[Event],
        topic: &str,
        fingerprint: &str,
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        let answer: OneOrMany = self
            .post(
                "/fill_effect",
                &FillRequest {
                    events: causes,
                    topic,
                    value_hash: fingerprint,
                    window,
                },
            )
            .await?;
        Ok(answer.into())
    }

    async fn fill_cause(
        &self,
        effects: &[Event],
        topic: &str,
        fingerprint: &str,
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        let answer: OneOrMany = self
            .post(
                "/fill_cause",
                &FillRequest {
                    events: effects,
                    topic,
                    value_hash: fingerprint,
                    window,
                },
            )
            .await?;
        Ok(answer.into())
    }

    async fn history_events(&self, filters: &HistoryFilters) -> UpstreamResult<Vec<Event>> {
        self.post("/history_get_events", filters).await
    }
}
