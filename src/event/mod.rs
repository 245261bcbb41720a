//! # Event Domain Types
//!
//! The unit of the causal log: an `Event` is one observed occurrence on a
//! topic, carrying the half-open time window `[init_time, time]` in which it
//! happened and an arbitrary JSON payload.
//!
//! This module provides:
//! - `Event` - One occurrence on a topic
//! - `EventStore` - Session-scoped id -> event mapping

mod store;

pub use store::EventStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// One occurrence on a topic.
///
/// `init_time`/`time` are nanosecond timestamps bounding the occurrence.
/// `time >= init_time` is the steady state; a merge may transiently violate
/// it and must restore it before the event is stored again.
///
/// Wire field names (`initTime`, `time`) follow the upstream JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque identifier. Stable across merges: a merged occurrence keeps
    /// the id of the event that was rendered first.
    pub id: String,

    /// Topic this event was published on.
    pub topic: String,

    /// Start of the occurrence window, in nanoseconds.
    #[serde(rename = "initTime")]
    pub init_time: i64,

    /// End of the occurrence window, in nanoseconds.
    pub time: i64,

    /// Arbitrary JSON payload. Clustering keys are derived from this value
    /// by the upstream fingerprint service, never locally.
    pub value: Value,
}

impl Event {
    /// Creates an event with a fresh v4 UUID id.
    pub fn new(topic: impl Into<String>, init_time: i64, time: i64, value: Value) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), topic, init_time, time, value)
    }

    /// Creates an event with an explicit id.
    pub fn with_id(
        id: impl Into<String>,
        topic: impl Into<String>,
        init_time: i64,
        time: i64,
        value: Value,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            init_time,
            time,
            value,
        }
    }

    /// Duration of the occurrence window in nanoseconds, floored at zero.
    pub fn elapsed(&self) -> i64 {
        (self.time - self.init_time).max(0)
    }

    /// Window start as a UTC datetime, if representable.
    pub fn init_time_utc(&self) -> Option<DateTime<Utc>> {
        ns_to_utc(self.init_time)
    }

    /// Window end as a UTC datetime, if representable.
    pub fn time_utc(&self) -> Option<DateTime<Utc>> {
        ns_to_utc(self.time)
    }
}

fn ns_to_utc(ns: i64) -> Option<DateTime<Utc>> {
    let secs = ns.div_euclid(NANOS_PER_SEC);
    let subsec = ns.rem_euclid(NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, subsec)
}
