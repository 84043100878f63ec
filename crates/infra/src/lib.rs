//! Infrastructure layer: transport implementations and the components built
//! on them (intake, worker loop, result stream reader).

pub mod backend;
pub mod intake;
pub mod reader;
pub mod stream_log;
pub mod worker;

#[cfg(test)]
mod integration_tests;

pub use backend::{FlightSearchBackend, simulated_delay_from_env};
pub use intake::{IntakeError, SearchIntake};
pub use reader::{AttachError, ReaderExit, ResultEvent, ResultStreamReader, ResultSubscription};
pub use worker::{SearchBackend, SearchWorker, WorkerConfig, WorkerHandle};

#[cfg(feature = "redis")]
pub use stream_log::redis::RedisStreamLog;

use farestream_streams::envelope::TraceCarrier;

/// Current span context as an envelope carrier, if there is anything to carry.
pub(crate) fn current_carrier() -> Option<TraceCarrier> {
    let carrier = farestream_observability::inject_context();
    (!carrier.is_empty()).then_some(carrier)
}
