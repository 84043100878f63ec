//! Request intake: accept a search, hand it to the work topic.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use farestream_core::{SearchId, SearchRequest};
use farestream_streams::{
    CodecError, RESULT_SEED_GROUP, SEARCH_REQUESTED_TOPIC, SearchJob, StartFrom, StreamLog,
    TransportError, result_topic, to_fields,
};

use crate::current_carrier;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Accepts validated search requests and publishes them to the work topic.
#[derive(Clone)]
pub struct SearchIntake {
    log: Arc<dyn StreamLog>,
}

impl SearchIntake {
    pub fn new(log: Arc<dyn StreamLog>) -> Self {
        Self { log }
    }

    /// Submit a search: mint an identity, publish the job envelope, return
    /// the identity immediately. Never waits for completion.
    ///
    /// The search's result topic is seeded before the job is published, so
    /// the returned identity is attachable right away — "submitted but not
    /// yet processed" streams instead of reading as "not found".
    ///
    /// # Errors
    ///
    /// Transport failure means the job is *not* submitted; the seeded result
    /// topic is reclaimed best-effort.
    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to), err)]
    pub fn submit(&self, request: &SearchRequest) -> Result<SearchId, IntakeError> {
        let search_id = SearchId::new();
        let job = SearchJob::new(search_id, request, current_carrier());
        let fields = to_fields(&job)?;

        let results = result_topic(&search_id);
        self.log
            .ensure_group(&results, RESULT_SEED_GROUP, StartFrom::Beginning)?;

        if let Err(err) = self.log.append(SEARCH_REQUESTED_TOPIC, &fields) {
            let _ = self.log.delete(&results);
            return Err(err.into());
        }

        let queue_depth = self.log.len(SEARCH_REQUESTED_TOPIC).unwrap_or_default();
        tracing::info!(search_id = %search_id, queue_depth, "search request submitted");
        Ok(search_id)
    }
}
