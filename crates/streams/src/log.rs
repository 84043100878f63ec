//! Durable log transport abstraction (mechanics only).
//!
//! A *topic* is an append-only, ordered log of flat string-keyed envelopes.
//! A *consumer group* is a named cursor plus a pending-entry list scoped to
//! one topic: entries read under a group stay pending until acknowledged,
//! and a pending entry whose lease has expired is redelivered to whichever
//! group member reads next.
//!
//! ## Delivery contract
//!
//! - **At-least-once within a group**: an entry is handed to one group
//!   member at a time; unacknowledged entries come back after the lease
//!   timeout. Consumers decide what acknowledgment means (the worker loop
//!   deliberately acks regardless of handler outcome).
//! - **Ordered per topic**: entries are delivered in append order; nothing
//!   is guaranteed across topics.
//! - **Bounded retention**: appends refresh a best-effort retention window;
//!   topics are not grow-forever durable storage.
//!
//! ## Concurrency
//!
//! Implementations must be safe for concurrent `append`/`read_group`/`ack`
//! from multiple threads; all bookkeeping is internal. Components receive an
//! explicitly constructed `Arc<dyn StreamLog>` rather than sharing ambient
//! connection state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Flat field mapping stored per envelope.
///
/// Ordered so encoded envelopes have a deterministic field order.
pub type FieldMap = BTreeMap<String, String>;

/// One delivered log entry: the transport-assigned id plus the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Monotonically increasing, topic-scoped entry identity.
    pub id: String,
    pub fields: FieldMap,
}

/// Where a newly created consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFrom {
    /// Deliver everything already in the topic (`0`).
    Beginning,
    /// Deliver only entries appended after group creation (`$`).
    Latest,
}

/// Transport-level failure.
///
/// Both variants mean "transport unavailable" to boundary callers; the split
/// mirrors where the failure occurred.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the underlying store.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The store was reachable but the command failed.
    #[error("transport command failed: {0}")]
    Command(String),
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Append-only topic log with consumer groups.
pub trait StreamLog: Send + Sync {
    /// Append an envelope to `topic`, creating the topic if absent.
    ///
    /// Refreshes the topic's retention deadline as a side effect.
    fn append(&self, topic: &str, fields: &FieldMap) -> TransportResult<String>;

    /// Create `topic` (if absent) and `group` (if absent).
    ///
    /// Creating a group that already exists is a no-op, not an error;
    /// `start` only applies to newly created groups.
    fn ensure_group(&self, topic: &str, group: &str, start: StartFrom) -> TransportResult<()>;

    /// Read up to `count` entries for `consumer` within `group`, blocking up
    /// to `block` when nothing is immediately deliverable.
    ///
    /// A timeout yields an empty batch, not an error. Delivers entries not
    /// yet handed to another member of the group, plus pending entries whose
    /// lease has expired (redelivery).
    fn read_group(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        block: Duration,
        count: usize,
    ) -> TransportResult<Vec<StreamEntry>>;

    /// Remove `entry_id` from the group's pending list.
    ///
    /// Acknowledging an unknown or already-acknowledged entry is a no-op.
    fn ack(&self, topic: &str, group: &str, entry_id: &str) -> TransportResult<()>;

    /// Whether `topic` exists (a created-but-empty topic exists).
    fn exists(&self, topic: &str) -> TransportResult<bool>;

    /// Number of entries in `topic`; 0 when the topic does not exist.
    fn len(&self, topic: &str) -> TransportResult<u64>;

    /// Remove the topic, its entries, and its groups. Idempotent.
    fn delete(&self, topic: &str) -> TransportResult<()>;
}

impl<L> StreamLog for Arc<L>
where
    L: StreamLog + ?Sized,
{
    fn append(&self, topic: &str, fields: &FieldMap) -> TransportResult<String> {
        (**self).append(topic, fields)
    }

    fn ensure_group(&self, topic: &str, group: &str, start: StartFrom) -> TransportResult<()> {
        (**self).ensure_group(topic, group, start)
    }

    fn read_group(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        block: Duration,
        count: usize,
    ) -> TransportResult<Vec<StreamEntry>> {
        (**self).read_group(topic, group, consumer, block, count)
    }

    fn ack(&self, topic: &str, group: &str, entry_id: &str) -> TransportResult<()> {
        (**self).ack(topic, group, entry_id)
    }

    fn exists(&self, topic: &str) -> TransportResult<bool> {
        (**self).exists(topic)
    }

    fn len(&self, topic: &str) -> TransportResult<u64> {
        (**self).len(topic)
    }

    fn delete(&self, topic: &str) -> TransportResult<()> {
        (**self).delete(topic)
    }
}
