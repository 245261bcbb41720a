//! # Topic Association Graph
//!
//! Static, externally supplied mapping from topic to the topics reachable as
//! a one-hop cause or effect. The explanation core never mutates it; it is
//! loaded once per session from the JSON shape the event broker publishes:
//!
//! ```json
//! { "A": { "causes": [], "effects": ["B"] } }
//! ```
//!
//! A topic absent from the map has empty cause and effect sets. That is a
//! normal condition, not an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One topic's declared neighbors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNeighbors {
    /// Topics that can appear one hop toward causes.
    #[serde(default)]
    pub causes: BTreeSet<String>,
    /// Topics that can appear one hop toward effects.
    #[serde(default)]
    pub effects: BTreeSet<String>,
}

/// Read-only topic -> neighbors mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicAssociations {
    topics: BTreeMap<String, TopicNeighbors>,
}

impl TopicAssociations {
    /// Creates an empty association graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from (topic, neighbors) pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, TopicNeighbors)>,
    {
        Self {
            topics: entries.into_iter().collect(),
        }
    }

    /// Topics declared as one-hop causes of `topic`. Empty for unknown topics.
    pub fn causes_of<'a>(&'a self, topic: &str) -> impl Iterator<Item = &'a str> {
        self.topics
            .get(topic)
            .map(|n| n.causes.iter())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Topics declared as one-hop effects of `topic`. Empty for unknown topics.
    pub fn effects_of<'a>(&'a self, topic: &str) -> impl Iterator<Item = &'a str> {
        self.topics
            .get(topic)
            .map(|n| n.effects.iter())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Returns true if `cause` is a declared cause of `topic`.
    pub fn is_cause_of(&self, topic: &str, cause: &str) -> bool {
        self.topics
            .get(topic)
            .map(|n| n.causes.contains(cause))
            .unwrap_or(false)
    }

    /// Returns true if `effect` is a declared effect of `topic`.
    pub fn is_effect_of(&self, topic: &str, effect: &str) -> bool {
        self.topics
            .get(topic)
            .map(|n| n.effects.contains(effect))
            .unwrap_or(false)
    }

    /// All known topics, in sorted order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TopicAssociations {
        serde_json::from_str(
            r#"{
                "A": { "causes": [], "effects": ["B"] },
                "B": { "causes": ["A"], "effects": ["C"] }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_associations_deserialize_wire_shape() {
        let assoc = sample();
        assert_eq!(assoc.topics().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(assoc.effects_of("A").collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(assoc.causes_of("B").collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_unknown_topic_has_empty_sets() {
        let assoc = sample();
        assert_eq!(assoc.causes_of("nope").count(), 0);
        assert_eq!(assoc.effects_of("nope").count(), 0);
        assert!(!assoc.is_cause_of("nope", "A"));
    }

    #[test]
    fn test_declared_neighbor_predicates() {
        let assoc = sample();
        assert!(assoc.is_effect_of("A", "B"));
        assert!(assoc.is_cause_of("B", "A"));
        assert!(!assoc.is_cause_of("A", "B"));
    }

    #[test]
    fn test_missing_fields_default_empty() {
        let assoc: TopicAssociations = serde_json::from_str(r#"{"X": {}}"#).unwrap();
        assert_eq!(assoc.causes_of("X").count(), 0);
        assert_eq!(assoc.effects_of("X").count(), 0);
    }
}
