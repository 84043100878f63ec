//! Request DTOs and the response envelope.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use farestream_core::SearchRequest;

#[derive(Debug, Deserialize)]
pub struct SearchRequestBody {
    pub from: String,
    pub to: String,
    pub date: String,
    #[serde(default)]
    pub passengers: u32,
}

impl SearchRequestBody {
    pub fn into_domain(self) -> SearchRequest {
        SearchRequest {
            from: self.from,
            to: self.to,
            date: self.date,
            passengers: self.passengers,
        }
    }
}

/// The `{success, message, data}` envelope every JSON response uses.
pub fn envelope(success: bool, message: &str, data: JsonValue) -> JsonValue {
    serde_json::json!({
        "success": success,
        "message": message,
        "data": data,
    })
}
