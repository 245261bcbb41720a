//! causelens - A deterministic causal-explanation graph engine
//!
//! Explores a causal event log by repeatedly asking "what could have caused
//! this?" / "what could this have caused?", building a multi-level,
//! de-duplicated graph of event clusters connected by probability-weighted
//! edges. Probabilities, fingerprints, and hydrated events come from an
//! external explainer service; this crate only consumes them.

pub mod event;
pub mod graph;
pub mod observability;
pub mod session;
pub mod topology;
pub mod traversal;
