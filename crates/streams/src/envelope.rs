//! Typed envelope records exchanged over topics.
//!
//! Envelopes travel as flat string-keyed field maps (see [`crate::codec`]);
//! these records are the typed view on either side of that boundary. Every
//! envelope carries `search_id` and a best-effort `trace_context` carrier.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use farestream_core::{SearchId, SearchRequest};

/// W3C trace-context carrier embedded in envelopes (`traceparent` etc.).
pub type TraceCarrier = HashMap<String, String>;

/// Work-topic envelope: one submitted search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchJob {
    pub search_id: SearchId,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub passengers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<TraceCarrier>,
}

impl SearchJob {
    pub fn new(
        search_id: SearchId,
        request: &SearchRequest,
        trace_context: Option<TraceCarrier>,
    ) -> Self {
        Self {
            search_id,
            from: request.from.clone(),
            to: request.to.clone(),
            date: request.date.clone(),
            passengers: request.passengers,
            trace_context,
        }
    }

    pub fn request(&self) -> SearchRequest {
        SearchRequest {
            from: self.from.clone(),
            to: self.to.clone(),
            date: self.date.clone(),
            passengers: self.passengers,
        }
    }
}

/// Search lifecycle status carried on result-topic envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Processing,
    Completed,
    Failed,
}

/// Result-topic envelope.
///
/// A search's result topic holds, in order: `processing` (zero or one), then
/// either a `completed` envelope carrying the results payload followed by the
/// terminal `completed` envelope carrying `total_results`, or a single
/// terminal `failed` envelope. Payload and count are split so a reader can
/// start rendering before the count arrives and so the terminal condition
/// stays unambiguous if the payload envelope is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchUpdate {
    pub search_id: SearchId,
    pub status: SearchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<TraceCarrier>,
}

impl SearchUpdate {
    /// The placeholder published when a worker picks a search up.
    pub fn processing(search_id: SearchId, trace_context: Option<TraceCarrier>) -> Self {
        Self {
            search_id,
            status: SearchStatus::Processing,
            results: Some(JsonValue::Array(Vec::new())),
            total_results: None,
            error: None,
            trace_context,
        }
    }

    /// The results payload envelope.
    pub fn completed(
        search_id: SearchId,
        results: JsonValue,
        trace_context: Option<TraceCarrier>,
    ) -> Self {
        Self {
            search_id,
            status: SearchStatus::Completed,
            results: Some(results),
            total_results: None,
            error: None,
            trace_context,
        }
    }

    /// The terminal envelope: `completed` plus the explicit result count.
    pub fn total(search_id: SearchId, total: u64, trace_context: Option<TraceCarrier>) -> Self {
        Self {
            search_id,
            status: SearchStatus::Completed,
            results: None,
            total_results: Some(total),
            error: None,
            trace_context,
        }
    }

    /// The terminal envelope for a search whose handling failed or timed out.
    pub fn failed(
        search_id: SearchId,
        error: impl Into<String>,
        trace_context: Option<TraceCarrier>,
    ) -> Self {
        Self {
            search_id,
            status: SearchStatus::Failed,
            results: None,
            total_results: None,
            error: Some(error.into()),
            trace_context,
        }
    }

    /// Whether observing this envelope ends the result stream.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            SearchStatus::Completed => self.total_results.is_some(),
            SearchStatus::Failed => true,
            SearchStatus::Processing => false,
        }
    }
}
