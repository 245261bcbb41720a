//! Cluster - De-duplicated explanation node
//!
//! A cluster is identified by (topic, fingerprint). The first event observed
//! for that pair becomes the representative; later events with the same key
//! are folded into it by the merge step instead of creating a second node.
//! Cluster identity is stable for the lifetime of one explanation session.

/// Cluster identifier: `"{topic}-{fingerprint}"`.
pub type ClusterId = String;

/// Builds the id for a (topic, fingerprint) pair.
pub fn cluster_id(topic: &str, fingerprint: &str) -> ClusterId {
    format!("{}-{}", topic, fingerprint)
}

/// One rendered node of the explanation graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// `"{topic}-{fingerprint}"`.
    pub id: ClusterId,
    /// Topic shared by every event folded into this cluster.
    pub topic: String,
    /// Value fingerprint shared by every event folded into this cluster.
    pub fingerprint: String,
    /// Id of the representative event in the `EventStore`.
    pub event_id: String,
    /// Level the cluster was first rendered at.
    pub level: i32,
}

impl Cluster {
    /// Creates a cluster for the given key, representative event, and level.
    pub fn new(
        topic: impl Into<String>,
        fingerprint: impl Into<String>,
        event_id: impl Into<String>,
        level: i32,
    ) -> Self {
        let topic = topic.into();
        let fingerprint = fingerprint.into();
        Self {
            id: cluster_id(&topic, &fingerprint),
            topic,
            fingerprint,
            event_id: event_id.into(),
            level,
        }
    }
}
