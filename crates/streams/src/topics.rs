//! Topic and consumer-group naming.

use farestream_core::SearchId;

/// Shared work topic: every submitted search lands here.
pub const SEARCH_REQUESTED_TOPIC: &str = "farestream:search.requested";

/// Prefix for per-search result topics.
pub const SEARCH_COMPLETED_PREFIX: &str = "farestream:search.completed";

/// Consumer group shared by all provider workers on the work topic.
pub const PROVIDER_GROUP: &str = "flight.providers";

/// Group created by intake to seed a search's result topic at submission
/// time, so "submitted but not yet processed" is distinguishable from "never
/// submitted". Never read from.
pub const RESULT_SEED_GROUP: &str = "init";

/// Result topic for one search.
pub fn result_topic(search_id: &SearchId) -> String {
    format!("{SEARCH_COMPLETED_PREFIX}:{search_id}")
}
