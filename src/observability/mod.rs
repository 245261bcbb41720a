//! # Observability
//!
//! Structured logging for the explanation engine.
//!
//! Principles:
//! 1. Observability is read-only; it never affects expansion
//! 2. Synchronous, no buffering
//! 3. Deterministic output: one JSON line per event, sorted fields
//!
//! ```ignore
//! use causelens::observability::Logger;
//!
//! Logger::info("EXPAND_COMPLETE", &[("level", "1"), ("clusters", "3")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};
