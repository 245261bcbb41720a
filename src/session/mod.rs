//! # Explanation Session
//!
//! Orchestrates one explanation of the causal event log: a frontier of seed
//! events is expanded one causal level at a time through a pluggable
//! traversal method, discovered events are de-duplicated into clusters
//! keyed by (topic, fingerprint), colliding time windows are folded by the
//! merge step, and the resulting probability-labeled edges are kept in the
//! edge ledger.
//!
//! One `expandLevel` runs as a single logical task: inputs are validated
//! and snapshotted first, the upstream call is the only suspension region,
//! and every mutation happens after it resolves under one write lock.
//! Failures before the mutation phase leave the session untouched.
//!
//! Session state is explicit; there are no ambient globals.

mod errors;
mod observer;

pub use errors::{ExplainError, ExplainResult};
pub use observer::GraphObserver;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use serde_json::Value;

use crate::event::{Event, EventStore};
use crate::graph::{cluster_id, merge, Cluster, ClusterId, Direction, Edge, EdgeLedger, LevelSequence};
use crate::observability::Logger;
use crate::topology::TopicAssociations;
use crate::traversal::{
    EventGroups, HistoryFilters, TimeWindow, TraversalMethod, TraversalOutcome, Upstream,
};

use observer::GraphChange;

/// How `expand_level` concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandStatus {
    /// The level was rendered (or extended) with the traversal's clusters.
    Expanded,
    /// The traversal found no causes/effects; nothing was mutated and no
    /// level container was created.
    NoResults,
    /// The session was cleared while the expansion was suspended; its
    /// results were discarded.
    Cancelled,
}

/// Report of one `expand_level` call.
#[derive(Debug, Clone)]
pub struct LevelExpansion {
    /// How the expansion concluded.
    pub status: ExpandStatus,
    /// The level that was (or would have been) expanded.
    pub level: i32,
    /// Clusters created by this expansion, in application order.
    pub new_clusters: Vec<ClusterId>,
    /// Clusters that absorbed a re-derived event.
    pub merged_clusters: Vec<ClusterId>,
    /// Edges inserted or overwritten.
    pub edges_updated: usize,
}

impl LevelExpansion {
    fn concluded(status: ExpandStatus, level: i32) -> Self {
        Self {
            status,
            level,
            new_clusters: Vec::new(),
            merged_clusters: Vec::new(),
            edges_updated: 0,
        }
    }
}

/// What a clear wipes besides clusters, levels, and edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Also drop the seed selection.
    Full,
    /// Keep the seed selection for re-rendering.
    KeepSeeds,
}

/// One page of topic history.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Events returned by the upstream log, in log order.
    pub events: Vec<Event>,
    /// True when the page came back short: the cursor reached the end of
    /// the filtered history.
    pub end_of_history: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    events: EventStore,
    clusters: BTreeMap<ClusterId, Cluster>,
    cluster_by_event: HashMap<String, ClusterId>,
    levels: LevelSequence,
    edges: EdgeLedger,
    seeds: Vec<String>,
    history: BTreeMap<String, HistoryFilters>,
    window: TimeWindow,
}

/// One operator's explanation of the causal event log.
pub struct ExplanationSession {
    associations: TopicAssociations,
    state: RwLock<SessionState>,
    observers: RwLock<Vec<Box<dyn GraphObserver>>>,
    /// Set while an expansion is suspended on its upstream call.
    in_flight: AtomicBool,
    /// Bumped by `clear`; a resuming expansion that observes a different
    /// generation discards its results.
    generation: AtomicU64,
}

impl ExplanationSession {
    /// Creates an empty session over the given association graph.
    pub fn new(associations: TopicAssociations) -> Self {
        Self {
            associations,
            state: RwLock::new(SessionState::default()),
            observers: RwLock::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// The association graph this session explains against.
    pub fn associations(&self) -> &TopicAssociations {
        &self.associations
    }

    /// Registers a graph observer. Observers are notified after each
    /// committed mutation phase, in registration order.
    pub fn register_observer(&self, observer: Box<dyn GraphObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    // =========================================================================
    // Level expansion
    // =========================================================================

    /// Expands `target_level` from the events in `event_ids`.
    ///
    /// With `method = None` the input events themselves are rendered as the
    /// seed level (both levels 0, no probabilities, no edges). Otherwise the
    /// method's upstream traversal supplies the candidate clusters, and
    /// edges are derived between each origin and the discovered clusters
    /// reachable through the association graph: `origin_level >
    /// target_level` is a cause expansion (edges point from the new cluster
    /// to the origin), anything else an effect expansion (the reverse).
    ///
    /// A second call while one is suspended is rejected with
    /// `ExpansionInProgress`. A `clear` racing the suspension cancels the
    /// expansion instead of letting it write into the reset session.
    pub async fn expand_level<U: Upstream>(
        &self,
        upstream: &U,
        method: Option<TraversalMethod>,
        event_ids: &[String],
        target_level: i32,
        origin_level: i32,
    ) -> ExplainResult<LevelExpansion> {
        let _guard = self.begin_expansion()?;
        let generation = self.generation.load(Ordering::SeqCst);

        // Phase 1: validate and snapshot. No mutation yet, so a missing id
        // aborts with the session untouched.
        let (inputs, window) = {
            let state = self.read_state()?;
            let mut inputs = Vec::with_capacity(event_ids.len());
            for id in event_ids {
                match state.events.get(id) {
                    Some(event) => inputs.push(event.clone()),
                    None => return Err(ExplainError::EventNotFound(id.clone())),
                }
            }
            (inputs, state.window)
        };
        if inputs.is_empty() {
            return Ok(LevelExpansion::concluded(ExpandStatus::NoResults, target_level));
        }

        Logger::trace(
            "EXPAND_START",
            &[
                ("level", &target_level.to_string()),
                ("origin", &origin_level.to_string()),
                ("inputs", &inputs.len().to_string()),
            ],
        );

        // Phase 2: the only suspension region. No locks are held.
        let outcome = match method {
            Some(method) => method.run(upstream, &inputs, window).await?,
            None => Self::group_seed_events(upstream, &inputs).await?,
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            Logger::warn("EXPAND_CANCELLED", &[("level", &target_level.to_string())]);
            return Ok(LevelExpansion::concluded(ExpandStatus::Cancelled, target_level));
        }
        if outcome.is_empty() {
            Logger::info("EXPAND_EMPTY", &[("level", &target_level.to_string())]);
            return Ok(LevelExpansion::concluded(ExpandStatus::NoResults, target_level));
        }

        // Phase 3: atomic mutation under the write lock.
        let (report, changes) =
            self.apply_expansion(&outcome, &inputs, method, target_level, origin_level)?;

        Logger::info(
            "EXPAND_COMPLETE",
            &[
                ("level", &target_level.to_string()),
                ("clusters", &report.new_clusters.len().to_string()),
                ("merges", &report.merged_clusters.len().to_string()),
                ("edges", &report.edges_updated.to_string()),
            ],
        );

        // Phase 4: notify, lock released.
        self.notify(&changes);
        Ok(report)
    }

    /// Renders the seed level from the current seed selection.
    ///
    /// Clears any previous graph (keeping the seeds) first; refuses while
    /// expanded levels exist so an in-progress exploration is not wiped by
    /// accident.
    pub async fn expand_seed_level<U: Upstream>(
        &self,
        upstream: &U,
    ) -> ExplainResult<LevelExpansion> {
        let seeds = {
            let state = self.read_state()?;
            if state.levels.is_expanded() {
                return Err(ExplainError::ExplanationNotCleared);
            }
            state.seeds.clone()
        };
        if seeds.is_empty() {
            return Err(ExplainError::NoSeedEvents);
        }
        self.clear(ClearMode::KeepSeeds)?;
        self.expand_level(upstream, None, &seeds, 0, 0).await
    }

    /// Groups the seed events by (topic, fingerprint); no probabilities.
    async fn group_seed_events<U: Upstream>(
        upstream: &U,
        inputs: &[Event],
    ) -> ExplainResult<TraversalOutcome> {
        let mut events = EventGroups::new();
        for event in inputs {
            let fingerprint = upstream.fingerprint(&event.value).await?;
            events
                .entry(event.topic.clone())
                .or_default()
                .entry(fingerprint)
                .or_default()
                .push(event.clone());
        }
        Ok(TraversalOutcome {
            probabilities: Default::default(),
            events,
        })
    }

    /// The mutation phase. Runs under the write lock with no awaits.
    fn apply_expansion(
        &self,
        outcome: &TraversalOutcome,
        inputs: &[Event],
        method: Option<TraversalMethod>,
        target_level: i32,
        origin_level: i32,
    ) -> ExplainResult<(LevelExpansion, Vec<GraphChange>)> {
        let mut state = self.write_state()?;
        let mut changes = Vec::new();
        let mut report = LevelExpansion::concluded(ExpandStatus::Expanded, target_level);

        if state.levels.ensure(target_level) {
            changes.push(GraphChange::LevelCreated(target_level));
        }

        // Cluster creation and merge routing. An incoming event whose
        // (topic, fingerprint) already has a cluster adopts the existing
        // representative's id so all later references agree.
        let mut pending_merges: BTreeMap<ClusterId, Event> = BTreeMap::new();
        for (topic, groups) in &outcome.events {
            for (fingerprint, group_events) in groups {
                let cid = cluster_id(topic, fingerprint);
                for event in group_events {
                    match state.clusters.get(&cid) {
                        None => {
                            let cluster =
                                Cluster::new(topic, fingerprint, event.id.clone(), target_level);
                            state.events.insert(event.clone());
                            state
                                .cluster_by_event
                                .insert(event.id.clone(), cid.clone());
                            state.levels.push_cluster(target_level, cid.clone());
                            state.clusters.insert(cid.clone(), cluster.clone());
                            changes.push(GraphChange::ClusterAdded(cluster, event.clone()));
                            report.new_clusters.push(cid.clone());
                        }
                        Some(cluster) => {
                            let Some(existing) = state.events.get(&cluster.event_id) else {
                                return Err(ExplainError::Internal(format!(
                                    "cluster {} references missing event {}",
                                    cid, cluster.event_id
                                )));
                            };
                            if event.init_time != existing.init_time
                                || event.time != existing.time
                            {
                                let mut incoming = event.clone();
                                incoming.id = existing.id.clone();
                                pending_merges.entry(cid.clone()).or_insert(incoming);
                            }
                        }
                    }
                }
            }
        }

        // Edge derivation. Only traversal expansions connect levels; the
        // seed rendering has no origins.
        if method.is_some() {
            let toward_causes = origin_level > target_level;
            let direction = if toward_causes {
                Direction::Cause
            } else {
                Direction::Effect
            };
            for origin in inputs {
                let Some(origin_cid) = state.cluster_by_event.get(&origin.id).cloned() else {
                    // Origin was never rendered; nothing to connect to.
                    continue;
                };
                let reachable: Vec<String> = if toward_causes {
                    self.associations
                        .causes_of(&origin.topic)
                        .map(str::to_string)
                        .collect()
                } else {
                    self.associations
                        .effects_of(&origin.topic)
                        .map(str::to_string)
                        .collect()
                };
                for topic in &reachable {
                    let Some(groups) = outcome.events.get(topic) else {
                        continue;
                    };
                    for fingerprint in groups.keys() {
                        let target_cid = cluster_id(topic, fingerprint);
                        let probability = outcome.probability(topic, fingerprint);
                        let edge = if toward_causes {
                            Edge::new(target_cid, origin_cid.clone(), probability, direction)
                        } else {
                            Edge::new(origin_cid.clone(), target_cid, probability, direction)
                        };
                        state.edges.insert(edge.clone());
                        changes.push(GraphChange::EdgeUpdated(edge));
                        report.edges_updated += 1;
                    }
                }
            }
        }

        // Merge recomputation, after edges so the fold sees the relations
        // this expansion just derived.
        for (cid, incoming) in pending_merges {
            let Some(cluster) = state.clusters.get(&cid) else {
                continue;
            };
            let Some(existing) = state.events.get(&cluster.event_id).cloned() else {
                continue;
            };
            let neighbors: Vec<Event> = state
                .edges
                .incident_to(&cid)
                .filter_map(|edge| edge.other_endpoint(&cid))
                .filter_map(|other_cid| state.clusters.get(other_cid))
                .filter_map(|other| state.events.get(&other.event_id))
                .cloned()
                .collect();
            let merged = merge(&existing, &incoming, neighbors.iter(), &self.associations);
            if merged.changed {
                state.events.insert(merged.event.clone());
            }
            changes.push(GraphChange::ClusterMerged(cid.clone(), merged.event));
            report.merged_clusters.push(cid);
        }

        Ok((report, changes))
    }

    // =========================================================================
    // Seed selection
    // =========================================================================

    /// Adds an already-stored event to the seed selection.
    pub fn add_seed_event(&self, event_id: &str) -> ExplainResult<()> {
        let mut state = self.write_state()?;
        if !state.events.contains(event_id) {
            return Err(ExplainError::EventNotFound(event_id.to_string()));
        }
        if state.seeds.iter().any(|id| id == event_id) {
            return Err(ExplainError::SeedAlreadyAdded(event_id.to_string()));
        }
        if state.levels.is_expanded() {
            return Err(ExplainError::ExplanationNotCleared);
        }
        state.seeds.push(event_id.to_string());
        Ok(())
    }

    /// Creates one seed event per value and selects them all.
    ///
    /// Returns the new event ids in value order.
    pub fn create_seed_events(
        &self,
        topic: &str,
        init_time: i64,
        time: i64,
        values: Vec<Value>,
    ) -> ExplainResult<Vec<String>> {
        if topic.is_empty() {
            return Err(ExplainError::InvalidSeed("topic is empty".to_string()));
        }
        if values.is_empty() {
            return Err(ExplainError::InvalidSeed("no values given".to_string()));
        }
        let mut state = self.write_state()?;
        let mut ids = Vec::with_capacity(values.len());
        for value in values {
            let event = Event::new(topic, init_time, time, value);
            ids.push(event.id.clone());
            state.seeds.push(event.id.clone());
            state.events.insert(event);
        }
        Ok(ids)
    }

    /// The ordered seed selection.
    pub fn seed_events(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.seeds.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Time range
    // =========================================================================

    /// Sets the window forwarded to every traversal call. `None` leaves the
    /// corresponding side unbounded.
    pub fn set_time_range(&self, min_time: Option<i64>, max_time: Option<i64>) -> ExplainResult<()> {
        let mut state = self.write_state()?;
        state.window = TimeWindow::bounded(min_time, max_time);
        Ok(())
    }

    /// The current traversal window.
    pub fn time_range(&self) -> TimeWindow {
        self.state
            .read()
            .map(|state| state.window)
            .unwrap_or_default()
    }

    // =========================================================================
    // History browsing
    // =========================================================================

    /// Fetches one page of a topic's history through the upstream log.
    ///
    /// `next = true` resumes after the stored cursor; otherwise the page
    /// starts from the beginning of the filtered range. Returned events are
    /// registered in the event store so they can become seeds.
    pub async fn fetch_history<U: Upstream>(
        &self,
        upstream: &U,
        topic: &str,
        next: bool,
    ) -> ExplainResult<HistoryPage> {
        let mut filters = {
            let mut state = self.write_state()?;
            state
                .history
                .entry(topic.to_string())
                .or_insert_with(|| HistoryFilters::for_topic(topic))
                .clone()
        };
        if !next {
            filters.cursor = None;
        }

        let events = upstream.history_events(&filters).await?;

        let end_of_history = events.len() < filters.limit;
        {
            let mut state = self.write_state()?;
            for event in &events {
                state.events.insert(event.clone());
            }
            if let Some(last) = events.last() {
                filters.cursor = Some(last.id.clone());
            }
            state.history.insert(topic.to_string(), filters);
        }

        Logger::trace(
            "HISTORY_PAGE",
            &[
                ("topic", topic),
                ("events", &events.len().to_string()),
                ("end", &end_of_history.to_string()),
            ],
        );
        Ok(HistoryPage {
            events,
            end_of_history,
        })
    }

    /// Replaces a topic's history filters. Values are fingerprinted through
    /// the upstream so the log can match on hashes. The cursor resets.
    pub async fn apply_topic_filters<U: Upstream>(
        &self,
        upstream: &U,
        topic: &str,
        min_time: Option<i64>,
        max_time: Option<i64>,
        values: Vec<Value>,
    ) -> ExplainResult<()> {
        let mut filters = HistoryFilters::for_topic(topic);
        filters.min_time = min_time;
        filters.max_time = max_time;
        if !values.is_empty() {
            let mut hashes = Vec::with_capacity(values.len());
            for value in &values {
                hashes.push(upstream.fingerprint(value).await?);
            }
            filters.values = Some(values);
            filters.values_hashes = Some(hashes);
        }
        let mut state = self.write_state()?;
        state.history.insert(topic.to_string(), filters);
        Ok(())
    }

    /// Resets a topic's history filters to the unfiltered default.
    pub fn clear_topic_filters(&self, topic: &str) -> ExplainResult<()> {
        let mut state = self.write_state()?;
        state
            .history
            .insert(topic.to_string(), HistoryFilters::for_topic(topic));
        Ok(())
    }

    /// The filters currently stored for a topic, if any.
    pub fn topic_filters(&self, topic: &str) -> Option<HistoryFilters> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.history.get(topic).cloned())
    }

    // =========================================================================
    // Clearing
    // =========================================================================

    /// Wipes clusters, levels, and edges; `ClearMode::Full` also drops the
    /// seed selection. Stored events survive so history and seeds stay
    /// addressable.
    ///
    /// Safe to call while an expansion is suspended: the generation bump
    /// makes the resuming expansion discard its results.
    pub fn clear(&self, mode: ClearMode) -> ExplainResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.write_state()?;
            state.clusters.clear();
            state.cluster_by_event.clear();
            state.levels.clear();
            state.edges.clear();
            if mode == ClearMode::Full {
                state.seeds.clear();
            }
        }
        Logger::info(
            "SESSION_CLEARED",
            &[("seeds_kept", if mode == ClearMode::Full { "false" } else { "true" })],
        );
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer.on_cleared();
            }
        }
        Ok(())
    }

    // =========================================================================
    // Read access for the rendering layer
    // =========================================================================

    /// The stored event under `id`, if any.
    pub fn event(&self, id: &str) -> Option<Event> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.events.get(id).cloned())
    }

    /// The cluster under `id`, if any.
    pub fn cluster(&self, id: &str) -> Option<Cluster> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.clusters.get(id).cloned())
    }

    /// The cluster an event is folded into, if it is rendered.
    pub fn cluster_of_event(&self, event_id: &str) -> Option<ClusterId> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.cluster_by_event.get(event_id).cloned())
    }

    /// Levels in render order.
    pub fn render_order(&self) -> Vec<i32> {
        self.state
            .read()
            .map(|state| state.levels.render_order().to_vec())
            .unwrap_or_default()
    }

    /// Cluster ids rendered at `level`, in insertion order.
    pub fn level_clusters(&self, level: i32) -> Vec<ClusterId> {
        self.state
            .read()
            .map(|state| state.levels.clusters_at(level).to_vec())
            .unwrap_or_default()
    }

    /// Every edge, in deterministic key order.
    pub fn edges(&self) -> Vec<Edge> {
        self.state
            .read()
            .map(|state| state.edges.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The edges touching a cluster.
    pub fn edges_incident_to(&self, cluster: &str) -> Vec<Edge> {
        self.state
            .read()
            .map(|state| state.edges.incident_to(cluster).cloned().collect())
            .unwrap_or_default()
    }

    /// Every rendered cluster id, sorted.
    pub fn cluster_ids(&self) -> BTreeSet<ClusterId> {
        self.state
            .read()
            .map(|state| state.clusters.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Registers an externally obtained event (e.g. from a detached log)
    /// so it can be referenced by id.
    pub fn register_event(&self, event: Event) -> ExplainResult<()> {
        let mut state = self.write_state()?;
        state.events.insert(event);
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin_expansion(&self) -> ExplainResult<InFlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ExplainError::ExpansionInProgress);
        }
        Ok(InFlightGuard {
            flag: &self.in_flight,
        })
    }

    fn read_state(&self) -> ExplainResult<std::sync::RwLockReadGuard<'_, SessionState>> {
        self.state
            .read()
            .map_err(|_| ExplainError::Internal("session state lock poisoned".to_string()))
    }

    fn write_state(&self) -> ExplainResult<std::sync::RwLockWriteGuard<'_, SessionState>> {
        self.state
            .write()
            .map_err(|_| ExplainError::Internal("session state lock poisoned".to_string()))
    }

    fn notify(&self, changes: &[GraphChange]) {
        let Ok(observers) = self.observers.read() else {
            return;
        };
        for change in changes {
            for observer in observers.iter() {
                change.dispatch(observer.as_ref());
            }
        }
    }
}

/// Resets the in-flight flag when the expansion finishes or its future is
/// dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
