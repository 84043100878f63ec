//! Result stream reader: follow one search's result topic to its end.
//!
//! State machine per search: `ATTACHING → STREAMING → CLOSED` (terminal) or
//! `NOT_FOUND` (terminal, immediate). `attach` covers the first transition;
//! [`ResultSubscription::run`] covers the rest.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use farestream_core::SearchId;
use farestream_observability::continue_trace;
use farestream_streams::envelope::TraceCarrier;
use farestream_streams::{
    CancelToken, StartFrom, StreamLog, TransportError, fields_to_json, result_topic,
};

/// Pause before retrying a failed result-topic read.
const READ_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Max envelopes per poll.
const READ_COUNT: usize = 10;

#[derive(Debug, Error)]
pub enum AttachError {
    /// The identity was never submitted, or its result topic has already
    /// been reclaimed. Distinct from "submitted, no results yet".
    #[error("search not found")]
    NotFound,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What a subscription pushes to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent {
    /// One envelope, mirrored as a JSON object of its fields.
    Update(JsonValue),
    /// Nothing arrived within one poll; lets the caller probe liveness
    /// between envelopes.
    Idle,
}

/// How a subscription's run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// Terminal envelope observed; the topic has been reclaimed.
    Completed,
    /// The caller cancelled or went away.
    Cancelled,
}

/// Attaches callers to per-search result topics.
#[derive(Clone)]
pub struct ResultStreamReader {
    log: Arc<dyn StreamLog>,
    block: Duration,
}

impl ResultStreamReader {
    pub fn new(log: Arc<dyn StreamLog>) -> Self {
        Self {
            log,
            block: Duration::from_secs(5),
        }
    }

    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    /// Attach to a search's result topic under a fresh private group, so
    /// simultaneous viewers of one search each get independent delivery.
    ///
    /// # Errors
    ///
    /// `NotFound` when the identity was never submitted or its topic has
    /// been reclaimed; transport errors pass through.
    pub fn attach(&self, search_id: &SearchId) -> Result<ResultSubscription, AttachError> {
        let topic = result_topic(search_id);
        if !self.log.exists(&topic)? {
            return Err(AttachError::NotFound);
        }

        let group = format!("reader-{}", Uuid::now_v7());
        self.log.ensure_group(&topic, &group, StartFrom::Beginning)?;

        Ok(ResultSubscription {
            log: self.log.clone(),
            search_id: *search_id,
            topic,
            group,
            consumer: format!("search-{search_id}"),
            block: self.block,
        })
    }
}

/// One attached caller's view of a result topic.
pub struct ResultSubscription {
    log: Arc<dyn StreamLog>,
    search_id: SearchId,
    topic: String,
    group: String,
    consumer: String,
    block: Duration,
}

impl ResultSubscription {
    /// Poll the topic, pushing each envelope to `push` as a discrete event
    /// and acknowledging it, until the terminal envelope closes the stream.
    ///
    /// Cancellation is observed at every iteration boundary — before each
    /// poll and between entries of one batch. `push` returning `false`
    /// (caller gone) also stops the loop. On the terminal envelope the topic
    /// is deleted: reclamation is what ends every other viewer's stream too.
    pub fn run<F>(&self, cancel: &CancelToken, mut push: F) -> ReaderExit
    where
        F: FnMut(ResultEvent) -> bool,
    {
        loop {
            if cancel.is_cancelled() {
                return ReaderExit::Cancelled;
            }

            let batch = match self.log.read_group(
                &self.topic,
                &self.group,
                &self.consumer,
                self.block,
                READ_COUNT,
            ) {
                Ok(batch) => batch,
                Err(err) => {
                    // Another viewer observing the terminal envelope deletes
                    // the topic out from under us; that ends this stream too.
                    if matches!(self.log.exists(&self.topic), Ok(false)) {
                        info!(search_id = %self.search_id, "result topic reclaimed elsewhere");
                        return ReaderExit::Completed;
                    }
                    error!(search_id = %self.search_id, error = %err, "result topic read failed");
                    thread::sleep(READ_RETRY_DELAY);
                    continue;
                }
            };

            if batch.is_empty() {
                if !push(ResultEvent::Idle) {
                    return ReaderExit::Cancelled;
                }
                continue;
            }

            for entry in batch {
                if cancel.is_cancelled() {
                    return ReaderExit::Cancelled;
                }

                let event = fields_to_json(&entry.fields);

                let span = info_span!("forward_result", search_id = %self.search_id);
                continue_trace(&span, event_carrier(&event).as_ref());
                let _guard = span.enter();

                let keep_going = push(ResultEvent::Update(event.clone()));

                if let Err(err) = self.log.ack(&self.topic, &self.group, &entry.id) {
                    warn!(entry_id = %entry.id, error = %err, "failed to ack result envelope");
                }

                if is_terminal(&event) {
                    if let Err(err) = self.log.delete(&self.topic) {
                        error!(error = %err, "failed to reclaim result topic");
                    }
                    info!(search_id = %self.search_id, "result stream completed");
                    return ReaderExit::Completed;
                }

                if !keep_going {
                    return ReaderExit::Cancelled;
                }
            }
        }
    }
}

/// Terminal iff `status=completed` with a non-empty `total_results`, or a
/// `failed` envelope.
fn is_terminal(event: &JsonValue) -> bool {
    let status = event
        .get("status")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();

    if status.eq_ignore_ascii_case("failed") {
        return true;
    }
    if !status.eq_ignore_ascii_case("completed") {
        return false;
    }
    match event.get("total_results") {
        Some(total) => !total.is_null() && total.as_str() != Some(""),
        None => false,
    }
}

fn event_carrier(event: &JsonValue) -> Option<TraceCarrier> {
    let object = event.get("trace_context")?.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|s| (name.clone(), s.to_string())))
            .collect(),
    )
}
