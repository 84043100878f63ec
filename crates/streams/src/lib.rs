//! `farestream-streams` — durable-log transport mechanics.
//!
//! This crate owns the transport-facing contract: the [`StreamLog`] trait
//! (append-only topics + consumer groups), the typed envelope records and
//! their tolerant flat-map codec, topic naming, and an in-memory transport
//! used by tests and the dev-mode API. Infrastructure-backed transports
//! (Redis Streams) live in `farestream-infra`.

pub mod cancel;
pub mod codec;
pub mod envelope;
pub mod in_memory;
pub mod log;
pub mod topics;

pub use cancel::CancelToken;
pub use codec::{CodecError, fields_to_json, from_fields, to_fields};
pub use envelope::{SearchJob, SearchStatus, SearchUpdate};
pub use in_memory::InMemoryStreamLog;
pub use log::{FieldMap, StartFrom, StreamEntry, StreamLog, TransportError, TransportResult};
pub use topics::{PROVIDER_GROUP, RESULT_SEED_GROUP, SEARCH_REQUESTED_TOPIC, result_topic};
