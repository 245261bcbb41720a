//! Shared test doubles for the explanation engine suites.
//!
//! `ScriptedUpstream` answers the upstream contract from canned maps, with
//! a deterministic local fingerprint (`"h" + value JSON`), so tests control
//! exactly what each traversal sees.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::Notify;

use causelens::event::Event;
use causelens::topology::TopicAssociations;
use causelens::traversal::{
    HistoryFilters, ProbabilityMap, TimeWindow, Upstream, UpstreamError, UpstreamResult,
};

/// Deterministic stand-in for the upstream fingerprint service.
pub fn fingerprint_of(value: &Value) -> String {
    format!("h{}", value)
}

/// Canned upstream: probability maps, hydration answers, realized events,
/// and a history log, all fixed at construction.
#[derive(Default)]
pub struct ScriptedUpstream {
    pub effect_probabilities: ProbabilityMap,
    pub cause_probabilities: ProbabilityMap,
    /// Hydration answers keyed by (topic, fingerprint).
    pub effect_events: BTreeMap<(String, String), Vec<Event>>,
    pub cause_events: BTreeMap<(String, String), Vec<Event>>,
    pub realized_effects: Vec<Event>,
    pub realized_causes: Vec<Event>,
    pub history: Vec<Event>,
    /// Endpoint names in call order, for interaction assertions.
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, topic: &str, probability: f64, event: Event) -> Self {
        let fp = fingerprint_of(&event.value);
        self.effect_probabilities
            .entry(topic.to_string())
            .or_default()
            .insert(fp.clone(), probability);
        self.effect_events
            .entry((topic.to_string(), fp))
            .or_default()
            .push(event);
        self
    }

    pub fn with_cause(mut self, topic: &str, probability: f64, event: Event) -> Self {
        let fp = fingerprint_of(&event.value);
        self.cause_probabilities
            .entry(topic.to_string())
            .or_default()
            .insert(fp.clone(), probability);
        self.cause_events
            .entry((topic.to_string(), fp))
            .or_default()
            .push(event);
        self
    }

    pub fn with_history(mut self, events: Vec<Event>) -> Self {
        self.history = events;
        self
    }

    fn record(&self, endpoint: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(endpoint.to_string());
        }
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Upstream for ScriptedUpstream {
    async fn fingerprint(&self, value: &Value) -> UpstreamResult<String> {
        self.record("value_to_hash");
        Ok(fingerprint_of(value))
    }

    async fn possible_effects(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        self.record("possible_effects");
        Ok(self.effect_probabilities.clone())
    }

    async fn possible_causes(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        self.record("possible_causes");
        Ok(self.cause_probabilities.clone())
    }

    async fn effects_of(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.record("effects_of");
        Ok(self.realized_effects.clone())
    }

    async fn causes_of(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.record("causes_of");
        Ok(self.realized_causes.clone())
    }

    async fn fill_effect(
        &self,
        _causes: &[Event],
        topic: &str,
        fingerprint: &str,
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.record("fill_effect");
        Ok(self
            .effect_events
            .get(&(topic.to_string(), fingerprint.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn fill_cause(
        &self,
        _effects: &[Event],
        topic: &str,
        fingerprint: &str,
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.record("fill_cause");
        Ok(self
            .cause_events
            .get(&(topic.to_string(), fingerprint.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn history_events(&self, filters: &HistoryFilters) -> UpstreamResult<Vec<Event>> {
        self.record("history_get_events");
        let mut matched: Vec<Event> = self
            .history
            .iter()
            .filter(|e| filters.topics.contains(&e.topic))
            .filter(|e| filters.min_time.map(|t| e.time >= t).unwrap_or(true))
            .filter(|e| filters.max_time.map(|t| e.time <= t).unwrap_or(true))
            .filter(|e| {
                filters
                    .values_hashes
                    .as_ref()
                    .map(|hashes| hashes.contains(&fingerprint_of(&e.value)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        if let Some(cursor) = &filters.cursor {
            if let Some(pos) = matched.iter().position(|e| &e.id == cursor) {
                matched.drain(..=pos);
            }
        }
        matched.truncate(filters.limit);
        Ok(matched)
    }
}

/// Upstream whose traversal calls always fail; used for atomicity tests.
pub struct FailingUpstream;

impl Upstream for FailingUpstream {
    async fn fingerprint(&self, _value: &Value) -> UpstreamResult<String> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn possible_effects(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn possible_causes(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn effects_of(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn causes_of(
        &self,
        _events: &[Event],
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn fill_effect(
        &self,
        _causes: &[Event],
        _topic: &str,
        _fingerprint: &str,
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn fill_cause(
        &self,
        _effects: &[Event],
        _topic: &str,
        _fingerprint: &str,
        _window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }

    async fn history_events(&self, _filters: &HistoryFilters) -> UpstreamResult<Vec<Event>> {
        Err(UpstreamError::Transport("scripted failure".to_string()))
    }
}

/// Upstream that parks its first traversal call until released, so tests
/// can observe a suspended expansion.
pub struct ParkedUpstream {
    inner: ScriptedUpstream,
    pub started: Notify,
    pub release: Notify,
}

impl ParkedUpstream {
    pub fn new(inner: ScriptedUpstream) -> Self {
        Self {
            inner,
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

impl Upstream for ParkedUpstream {
    async fn fingerprint(&self, value: &Value) -> UpstreamResult<String> {
        self.inner.fingerprint(value).await
    }

    async fn possible_effects(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.possible_effects(events, window).await
    }

    async fn possible_causes(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap> {
        self.inner.possible_causes(events, window).await
    }

    async fn effects_of(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.inner.effects_of(events, window).await
    }

    async fn causes_of(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.inner.causes_of(events, window).await
    }

    async fn fill_effect(
        &self,
        causes: &[Event],
        topic: &str,
        fingerprint: &str,
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.inner.fill_effect(causes, topic, fingerprint, window).await
    }

    async fn fill_cause(
        &self,
        effects: &[Event],
        topic: &str,
        fingerprint: &str,
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>> {
        self.inner.fill_cause(effects, topic, fingerprint, window).await
    }

    async fn history_events(&self, filters: &HistoryFilters) -> UpstreamResult<Vec<Event>> {
        self.inner.history_events(filters).await
    }
}

/// The association graph used across the suites:
/// `A --effects--> B --effects--> C`.
pub fn chain_associations() -> TopicAssociations {
    serde_json::from_str(
        r#"{
            "A": { "causes": [], "effects": ["B"] },
            "B": { "causes": ["A"], "effects": ["C"] },
            "C": { "causes": ["B"], "effects": [] }
        }"#,
    )
    .unwrap()
}
