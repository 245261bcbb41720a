//! # Traversal Methods
//!
//! Pluggable strategies that expand a frontier of events into the next
//! level's candidate clusters and probabilities. Six methods exist, all
//! composed from the upstream primitives (`possible_*`, `*_of`, `fill_*`):
//!
//! - `PossibleEffects` / `PossibleCauses` - hydrate every candidate from
//!   the probability map
//! - `PossibleEffectsMaxProbabilities` / `PossibleCausesMaxProbabilities` -
//!   keep only each topic's highest-probability fingerprint, then hydrate
//! - `EffectsOfWithProbabilities` / `CausesOfWithProbabilities` - take the
//!   realized-event list as ground truth and attach looked-up probabilities
//!
//! The builder is agnostic to which method runs; each resolves to the same
//! `TraversalOutcome` shape.

mod errors;
mod http;
mod upstream;

pub use errors::{UpstreamError, UpstreamResult};
pub use http::{HttpUpstream, HttpUpstreamConfig};
pub use upstream::Upstream;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;

/// Probability per (topic, fingerprint), as returned by `possible_*`.
pub type ProbabilityMap = BTreeMap<String, BTreeMap<String, f64>>;

/// Candidate events per (topic, fingerprint).
pub type EventGroups = BTreeMap<String, BTreeMap<String, Vec<Event>>>;

/// Inclusive time filter forwarded to every upstream primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest admissible time, in nanoseconds.
    #[serde(rename = "minTime")]
    pub min_time: i64,
    /// Latest admissible time, in nanoseconds.
    #[serde(rename = "maxTime")]
    pub max_time: i64,
}

impl TimeWindow {
    /// Window admitting every representable time.
    pub fn unbounded() -> Self {
        Self {
            min_time: 0,
            max_time: i64::MAX,
        }
    }

    /// Window with the given bounds; `None` falls back to the unbounded
    /// side.
    pub fn bounded(min_time: Option<i64>, max_time: Option<i64>) -> Self {
        Self {
            min_time: min_time.unwrap_or(0),
            max_time: max_time.unwrap_or(i64::MAX),
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// History page request forwarded to the upstream event log.
///
/// Wire names follow the upstream JSON contract. `cursor` is the id of the
/// last event of the previous page; pagination resumes after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilters {
    /// Topics to include.
    pub topics: Vec<String>,
    /// Page size.
    pub limit: usize,
    /// Earliest admissible time, in nanoseconds.
    #[serde(rename = "minTime", skip_serializing_if = "Option::is_none")]
    pub min_time: Option<i64>,
    /// Latest admissible time, in nanoseconds.
    #[serde(rename = "maxTime", skip_serializing_if = "Option::is_none")]
    pub max_time: Option<i64>,
    /// Raw value filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    /// Fingerprints of `values`, precomputed through the upstream.
    #[serde(rename = "valuesHashes", skip_serializing_if = "Option::is_none")]
    pub values_hashes: Option<Vec<String>>,
    /// Resume-after event id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl HistoryFilters {
    /// Default page size for history browsing.
    pub const DEFAULT_LIMIT: usize = 10;

    /// Unfiltered page request for one topic.
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topics: vec![topic.into()],
            limit: Self::DEFAULT_LIMIT,
            min_time: None,
            max_time: None,
            values: None,
            values_hashes: None,
            cursor: None,
        }
    }
}

/// Resolved result of one traversal call: candidate events grouped by
/// (topic, fingerprint) plus the probability of each group.
///
/// An empty `events` map means the traversal found no causes/effects; the
/// builder treats that as a no-op, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalOutcome {
    /// Probability per (topic, fingerprint). Empty for the seed rendering,
    /// which has no probabilities.
    pub probabilities: ProbabilityMap,
    /// Candidate events per (topic, fingerprint).
    pub events: EventGroups,
}

impl TraversalOutcome {
    /// Returns true if the traversal produced no candidate events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Probability recorded for a (topic, fingerprint), `0.0` when the map
    /// has no entry for it.
    pub fn probability(&self, topic: &str, fingerprint: &str) -> f64 {
        self.probabilities
            .get(topic)
            .and_then(|fps| fps.get(fingerprint))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Closed set of traversal strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraversalMethod {
    /// Hydrate every possible effect.
    PossibleEffects,
    /// Hydrate only each topic's most probable effect.
    PossibleEffectsMaxProbabilities,
    /// Realized effects with probabilities attached.
    EffectsOfWithProbabilities,
    /// Hydrate every possible cause.
    PossibleCauses,
    /// Hydrate only each topic's most probable cause.
    PossibleCausesMaxProbabilities,
    /// Realized causes with probabilities attached.
    CausesOfWithProbabilities,
}

impl TraversalMethod {
    /// Returns true for the three strategies that expand toward causes.
    pub fn toward_causes(&self) -> bool {
        matches!(
            self,
            TraversalMethod::PossibleCauses
                | TraversalMethod::PossibleCausesMaxProbabilities
                | TraversalMethod::CausesOfWithProbabilities
        )
    }

    /// Runs the strategy against the upstream for the given frontier.
    pub async fn run<U: Upstream>(
        &self,
        upstream: &U,
        inputs: &[Event],
        window: TimeWindow,
    ) -> UpstreamResult<TraversalOutcome> {
        match self {
            TraversalMethod::PossibleEffects => {
                let probabilities = upstream.possible_effects(inputs, window).await?;
                hydrate_all(upstream, inputs, window, probabilities, false).await
            }
            TraversalMethod::PossibleCauses => {
                let probabilities = upstream.possible_causes(inputs, window).await?;
                hydrate_all(upstream, inputs, window, probabilities, true).await
            }
            TraversalMethod::PossibleEffectsMaxProbabilities => {
                let probabilities = upstream.possible_effects(inputs, window).await?;
                hydrate_all(upstream, inputs, window, reduce_to_max(probabilities), false).await
            }
            TraversalMethod::PossibleCausesMaxProbabilities => {
                let probabilities = upstream.possible_causes(inputs, window).await?;
                hydrate_all(upstream, inputs, window, reduce_to_max(probabilities), true).await
            }
            TraversalMethod::EffectsOfWithProbabilities => {
                let realized = upstream.effects_of(inputs, window).await?;
                let probabilities = upstream.possible_effects(inputs, window).await?;
                realized_with_probabilities(upstream, realized, probabilities).await
            }
            TraversalMethod::CausesOfWithProbabilities => {
                let realized = upstream.causes_of(inputs, window).await?;
                let probabilities = upstream.possible_causes(inputs, window).await?;
                realized_with_probabilities(upstream, realized, probabilities).await
            }
        }
    }
}

impl std::fmt::Display for TraversalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TraversalMethod::PossibleEffects => "possibleEffects",
            TraversalMethod::PossibleEffectsMaxProbabilities => "possibleEffectsMaxProbabilities",
            TraversalMethod::EffectsOfWithProbabilities => "effectsOfWithProbabilities",
            TraversalMethod::PossibleCauses => "possibleCauses",
            TraversalMethod::PossibleCausesMaxProbabilities => "possibleCausesMaxProbabilities",
            TraversalMethod::CausesOfWithProbabilities => "causesOfWithProbabilities",
        };
        f.write_str(name)
    }
}

/// Hydrates every (topic, fingerprint) of a probability map into events.
async fn hydrate_all<U: Upstream>(
    upstream: &U,
    inputs: &[Event],
    window: TimeWindow,
    probabilities: ProbabilityMap,
    toward_causes: bool,
) -> UpstreamResult<TraversalOutcome> {
    let mut events: EventGroups = BTreeMap::new();
    for (topic, fingerprints) in &probabilities {
        let groups = events.entry(topic.clone()).or_default();
        for fingerprint in fingerprints.keys() {
            let hydrated = if toward_causes {
                upstream.fill_cause(inputs, topic, fingerprint, window).await?
            } else {
                upstream.fill_effect(inputs, topic, fingerprint, window).await?
            };
            groups.insert(fingerprint.clone(), hydrated);
        }
    }
    Ok(TraversalOutcome {
        probabilities,
        events,
    })
}

/// Keeps only the highest-probability fingerprint of each topic.
///
/// Ties keep the first fingerprint in map iteration order; only a strictly
/// greater probability displaces the current maximum.
fn reduce_to_max(probabilities: ProbabilityMap) -> ProbabilityMap {
    let mut reduced = ProbabilityMap::new();
    for (topic, fingerprints) in probabilities {
        let mut best: Option<(&String, f64)> = None;
        for (fingerprint, &probability) in &fingerprints {
            match best {
                Some((_, max)) if probability <= max => {}
                _ => best = Some((fingerprint, probability)),
            }
        }
        if let Some((fingerprint, probability)) = best {
            reduced
                .entry(topic.clone())
                .or_default()
                .insert(fingerprint.clone(), probability);
        }
    }
    reduced
}

/// Groups realized events by (topic, fingerprint), attaching probabilities
/// looked up from the full map. The first event observed per key wins;
/// duplicates are dropped. A realized event with no probability entry keeps
/// probability `0.0`.
async fn realized_with_probabilities<U: Upstream>(
    upstream: &U,
    realized: Vec<Event>,
    all_probabilities: ProbabilityMap,
) -> UpstreamResult<TraversalOutcome> {
    let mut probabilities = ProbabilityMap::new();
    let mut events: EventGroups = BTreeMap::new();
    for event in realized {
        let fingerprint = upstream.fingerprint(&event.value).await?;
        let group = probabilities.entry(event.topic.clone()).or_default();
        if group.contains_key(&fingerprint) {
            continue;
        }
        let probability = all_probabilities
            .get(&event.topic)
            .and_then(|fps| fps.get(&fingerprint))
            .copied()
            .unwrap_or(0.0);
        group.insert(fingerprint.clone(), probability);
        events
            .entry(event.topic.clone())
            .or_default()
            .insert(fingerprint, vec![event]);
    }
    Ok(TraversalOutcome {
        probabilities,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probability_map(entries: &[(&str, &[(&str, f64)])]) -> ProbabilityMap {
        entries
            .iter()
            .map(|(topic, fps)| {
                (
                    topic.to_string(),
                    fps.iter().map(|(h, p)| (h.to_string(), *p)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_reduce_to_max_keeps_argmax_per_topic() {
        let reduced = reduce_to_max(probability_map(&[
            ("B", &[("h1", 0.2), ("h2", 0.7), ("h3", 0.1)]),
            ("C", &[("h4", 0.5)]),
        ]));

        assert_eq!(reduced["B"].len(), 1);
        assert_eq!(reduced["B"]["h2"], 0.7);
        assert_eq!(reduced["C"]["h4"], 0.5);
    }

    #[test]
    fn test_reduce_to_max_tie_break_is_first_in_order() {
        let reduced = reduce_to_max(probability_map(&[(
            "B",
            &[("h1", 0.4), ("h2", 0.4), ("h3", 0.4)],
        )]));

        assert_eq!(reduced["B"].keys().collect::<Vec<_>>(), vec!["h1"]);
    }

    #[test]
    fn test_toward_causes() {
        assert!(TraversalMethod::PossibleCauses.toward_causes());
        assert!(TraversalMethod::CausesOfWithProbabilities.toward_causes());
        assert!(!TraversalMethod::PossibleEffects.toward_causes());
        assert!(!TraversalMethod::EffectsOfWithProbabilities.toward_causes());
    }

    #[test]
    fn test_outcome_probability_lookup_defaults_to_zero() {
        let outcome = TraversalOutcome {
            probabilities: probability_map(&[("B", &[("h1", 0.8)])]),
            events: BTreeMap::new(),
        };
        assert_eq!(outcome.probability("B", "h1"), 0.8);
        assert_eq!(outcome.probability("B", "h9"), 0.0);
        assert_eq!(outcome.probability("Z", "h1"), 0.0);
    }

    #[test]
    fn test_time_window_serializes_wire_names() {
        let w = TimeWindow::bounded(Some(10), None);
        let v = serde_json::to_value(w).unwrap();
        assert_eq!(v["minTime"], 10);
        assert_eq!(v["maxTime"], i64::MAX);
    }

    #[test]
    fn test_history_filters_skip_absent_fields() {
        let f = HistoryFilters::for_topic("A");
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["topics"][0], "A");
        assert_eq!(v["limit"], 10);
        assert!(v.get("cursor").is_none());
        assert!(v.get("valuesHashes").is_none());
    }

    #[test]
    fn test_method_display_names() {
        assert_eq!(
            TraversalMethod::PossibleEffectsMaxProbabilities.to_string(),
            "possibleEffectsMaxProbabilities"
        );
        assert_eq!(
            TraversalMethod::CausesOfWithProbabilities.to_string(),
            "causesOfWithProbabilities"
        );
    }
}
