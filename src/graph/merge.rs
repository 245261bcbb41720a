//! Merge - Time-window folding for re-derived occurrences
//!
//! When an expansion lands on a cluster that already has a representative
//! event, the two describe the same logical occurrence reached through a
//! different traversal path, usually with a shifted time window. The merge
//! recomputes the representative's window from the cluster's incident
//! neighbors instead of overwriting it:
//!
//! - a connected cause cannot have finished before the window opens, so a
//!   later cause `time` pulls `init_time` forward;
//! - a connected effect cannot have started after the window closes, so an
//!   earlier effect `init_time` pulls `time` back;
//! - the window may shift or shrink but never grow past its original
//!   duration.
//!
//! This is a pure function over (events, neighbors, associations); the
//! caller applies the result back into the `EventStore`.

use crate::event::Event;
use crate::topology::TopicAssociations;

/// Result of folding an incoming event into an existing representative.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The representative event with its recomputed window. Identity
    /// (`id`, `topic`, `value`) is always the existing event's.
    pub event: Event,
    /// True if the recomputed window differs from the existing event's.
    pub changed: bool,
}

/// Folds `incoming` into `existing`, tightening the window against the
/// events at the far end of every incident edge.
///
/// `neighbors` are the far-endpoint representative events of the edges
/// currently touching the cluster. `incoming` contributes no fields to the
/// result (its window is what triggered the fold); the recomputation starts
/// from `existing` and is driven entirely by the neighbors.
pub fn merge<'a, I>(
    existing: &Event,
    incoming: &Event,
    neighbors: I,
    associations: &TopicAssociations,
) -> MergeOutcome
where
    I: IntoIterator<Item = &'a Event>,
{
    debug_assert_eq!(existing.topic, incoming.topic);

    let elapsed = existing.elapsed();
    let mut merged = existing.clone();

    for other in neighbors {
        if associations.is_cause_of(&merged.topic, &other.topic) && other.time > merged.init_time {
            merged.init_time = other.time;
        }
        if associations.is_effect_of(&merged.topic, &other.topic) && other.init_time < merged.time {
            merged.time = other.init_time;
        }
    }

    // The merged window may shift or shrink, never grow.
    if merged.time > merged.init_time + elapsed {
        merged.time = merged.init_time + elapsed;
    }

    let changed = merged.init_time != existing.init_time || merged.time != existing.time;
    MergeOutcome {
        event: merged,
        changed,
    }
}
