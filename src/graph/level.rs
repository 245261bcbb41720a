//! LevelSequence - Render-ordered causal depth containers
//!
//! Level 0 holds the seed clusters; positive levels extend toward effects,
//! negative levels toward causes. Render order keeps effects stacked at the
//! front and causes at the back: a new positive level is prepended, a new
//! negative level appended. Levels are never reordered once created, and a
//! level's cluster list is append-only.

use std::collections::BTreeMap;

use super::ClusterId;

/// Ordered set of levels rendered in one explanation.
#[derive(Debug, Clone, Default)]
pub struct LevelSequence {
    /// Levels in render order (front = effects end).
    order: Vec<i32>,
    /// Cluster ids per level, in insertion order.
    members: BTreeMap<i32, Vec<ClusterId>>,
}

impl LevelSequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a container for `level` exists.
    ///
    /// Returns true if the container was created by this call. Positive
    /// levels are prepended to the render order, negative levels appended,
    /// level 0 takes whichever end is free first (it is always created
    /// before any other level in practice).
    pub fn ensure(&mut self, level: i32) -> bool {
        if self.members.contains_key(&level) {
            return false;
        }
        if level > 0 {
            self.order.insert(0, level);
        } else {
            self.order.push(level);
        }
        self.members.insert(level, Vec::new());
        true
    }

    /// Appends a cluster to an existing level container.
    ///
    /// No-op when the level does not exist; `ensure` must run first.
    pub fn push_cluster(&mut self, level: i32, cluster: ClusterId) {
        if let Some(members) = self.members.get_mut(&level) {
            members.push(cluster);
        }
    }

    /// Returns true if a container for `level` exists.
    pub fn contains(&self, level: i32) -> bool {
        self.members.contains_key(&level)
    }

    /// Returns true if any level besides the seed level exists.
    pub fn is_expanded(&self) -> bool {
        self.members.keys().any(|&l| l != 0)
    }

    /// Levels in render order.
    pub fn render_order(&self) -> &[i32] {
        &self.order
    }

    /// Cluster ids rendered at `level`, in insertion order.
    pub fn clusters_at(&self, level: i32) -> &[ClusterId] {
        self.members.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no level exists.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes every level.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
