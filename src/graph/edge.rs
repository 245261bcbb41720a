//! EdgeLedger - Probability-labeled relations between clusters
//!
//! Edges are keyed by the unordered pair of endpoint cluster ids, so
//! re-deriving a relation from another expansion overwrites the label
//! instead of duplicating the edge. Direction and probability live in the
//! edge value, not the key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ClusterId;

/// Which way a relation was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Derived while expanding toward causes.
    Cause,
    /// Derived while expanding toward effects.
    Effect,
}

impl Direction {
    /// Returns the wire/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Cause => "cause",
            Direction::Effect => "effect",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unordered pair of cluster ids.
///
/// Construction sorts the endpoints, so `(a, b)` and `(b, a)` are the same
/// key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey(ClusterId, ClusterId);

impl EdgeKey {
    /// Builds the key for two endpoints, in either order.
    pub fn new(a: impl Into<ClusterId>, b: impl Into<ClusterId>) -> Self {
        let a = a.into();
        let b = b.into();
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Returns true if `cluster` is one of the endpoints.
    pub fn touches(&self, cluster: &str) -> bool {
        self.0 == cluster || self.1 == cluster
    }
}

/// Directed, probability-labeled relation between two clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Cluster the relation points from.
    pub from: ClusterId,
    /// Cluster the relation points to.
    pub to: ClusterId,
    /// Probability label supplied by the traversal result.
    pub probability: f64,
    /// Expansion direction the edge was derived in.
    pub direction: Direction,
}

impl Edge {
    /// Creates an edge.
    pub fn new(
        from: impl Into<ClusterId>,
        to: impl Into<ClusterId>,
        probability: f64,
        direction: Direction,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            probability,
            direction,
        }
    }

    /// Key of the unordered endpoint pair.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.to.clone())
    }

    /// Given one endpoint, returns the other. `None` when `cluster` is not
    /// an endpoint.
    pub fn other_endpoint(&self, cluster: &str) -> Option<&ClusterId> {
        if self.from == cluster {
            Some(&self.to)
        } else if self.to == cluster {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// Unordered-pair keyed edge map with last-write-wins insertion.
#[derive(Debug, Clone, Default)]
pub struct EdgeLedger {
    edges: BTreeMap<EdgeKey, Edge>,
}

impl EdgeLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an edge under its unordered endpoint pair.
    ///
    /// Re-inserting a pair overwrites the stored edge (label, probability,
    /// and direction); the ledger never holds two edges for one pair.
    pub fn insert(&mut self, edge: Edge) {
        self.edges.insert(edge.key(), edge);
    }

    /// Returns the edge stored for the unordered pair `(a, b)`, if any.
    pub fn get(&self, a: &str, b: &str) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    /// Finite, restartable iterator over edges touching `cluster`.
    pub fn incident_to<'a>(&'a self, cluster: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges
            .iter()
            .filter(move |(key, _)| key.touches(cluster))
            .map(|(_, edge)| edge)
    }

    /// All edges, in deterministic key order.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of stored edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if the ledger holds no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Removes every edge.
    pub fn clear(&mut self) {
        self.edges.clear();
    }
}
