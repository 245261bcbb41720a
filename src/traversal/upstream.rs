//! Upstream - Contract with the external explainer service
//!
//! The core consumes probabilities, fingerprints, and hydrated events; it
//! never computes them. This trait captures the request/response contract
//! independent of transport. `HttpUpstream` is the production
//! implementation; tests script the trait directly.

use serde_json::Value;

use crate::event::Event;

use super::errors::UpstreamResult;
use super::{HistoryFilters, ProbabilityMap, TimeWindow};

/// Async oracle backing traversal expansion.
///
/// Every method maps to one upstream request. All event-set primitives
/// accept a time window; `TimeWindow::unbounded()` means no filter.
#[allow(async_fn_in_trait)]
pub trait Upstream {
    /// Deterministic fingerprint of a JSON value. Same value, same token;
    /// the core uses the token only as an opaque grouping key.
    async fn fingerprint(&self, value: &Value) -> UpstreamResult<String>;

    /// Probability of each (topic, fingerprint) reachable as an effect of
    /// `events`.
    async fn possible_effects(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap>;

    /// Probability of each (topic, fingerprint) reachable as a cause of
    /// `events`.
    async fn possible_causes(
        &self,
        events: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<ProbabilityMap>;

    /// Concrete realized effects of `events`.
    async fn effects_of(&self, events: &[Event], window: TimeWindow)
        -> UpstreamResult<Vec<Event>>;

    /// Concrete realized causes of `events`.
    async fn causes_of(&self, events: &[Event], window: TimeWindow)
        -> UpstreamResult<Vec<Event>>;

    /// Hydrates one (topic, fingerprint) effect candidate into full events.
    /// Upstream may answer a single event; implementations normalize to a
    /// list.
    async fn fill_effect(
        &self,
        causes: &[Event],
        topic: &str,
        fingerprint: &str,
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>>;

    /// Hydrates one (topic, fingerprint) cause candidate into full events.
    async fn fill_cause(
        &self,
        effects: &[Event],
        topic: &str,
        fingerprint: &str,
        window: TimeWindow,
    ) -> UpstreamResult<Vec<Event>>;

    /// One page of the event history matching `filters`.
    async fn history_events(&self, filters: &HistoryFilters) -> UpstreamResult<Vec<Event>>;
}
