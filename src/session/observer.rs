//! Graph observers
//!
//! The core exposes graph changes through a subscriber interface instead of
//! touching any rendering concern itself. A rendering layer registers an
//! observer and redraws from the notifications plus the session's read
//! accessors.
//!
//! Callbacks fire after the mutation phase has committed and the state lock
//! has been released, in the order the changes were applied.

use crate::event::Event;
use crate::graph::{Cluster, Edge};

/// Subscriber for explanation graph changes.
///
/// All methods default to no-ops so observers implement only what they
/// draw.
pub trait GraphObserver: Send + Sync {
    /// A level container was created.
    fn on_level_created(&self, _level: i32) {}

    /// A cluster was created and its representative event registered.
    fn on_cluster_added(&self, _cluster: &Cluster, _event: &Event) {}

    /// An edge was inserted or its label overwritten.
    fn on_edge_updated(&self, _edge: &Edge) {}

    /// A cluster absorbed a re-derived event; `event` carries the
    /// recomputed window.
    fn on_cluster_merged(&self, _cluster_id: &str, _event: &Event) {}

    /// The explanation was cleared.
    fn on_cleared(&self) {}
}

/// Buffered change record, dispatched once the state lock is released.
#[derive(Debug, Clone)]
pub(crate) enum GraphChange {
    LevelCreated(i32),
    ClusterAdded(Cluster, Event),
    EdgeUpdated(Edge),
    ClusterMerged(String, Event),
}

impl GraphChange {
    pub(crate) fn dispatch(&self, observer: &dyn GraphObserver) {
        match self {
            GraphChange::LevelCreated(level) => observer.on_level_created(*level),
            GraphChange::ClusterAdded(cluster, event) => observer.on_cluster_added(cluster, event),
            GraphChange::EdgeUpdated(edge) => observer.on_edge_updated(edge),
            GraphChange::ClusterMerged(id, event) => observer.on_cluster_merged(id, event),
        }
    }
}
