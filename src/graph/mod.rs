//! # Explanation Graph Primitives
//!
//! The rendered shape of one explanation session:
//! - `Cluster` - De-duplicated node keyed by (topic, fingerprint)
//! - `LevelSequence` - Render-ordered causal depth containers
//! - `Edge` / `EdgeLedger` - Probability-labeled relations between clusters
//! - `merge` - Time-window folding for re-derived occurrences
//!
//! These are data containers plus one pure algorithm. Orchestration
//! (expansion, upstream calls, notification) lives in `session`.

mod cluster;
mod edge;
mod level;
mod merge;

pub use cluster::{cluster_id, Cluster, ClusterId};
pub use edge::{Direction, Edge, EdgeKey, EdgeLedger};
pub use level::LevelSequence;
pub use merge::{merge, MergeOutcome};
