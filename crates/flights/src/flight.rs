//! The flight record served back to callers.

use serde::{Deserialize, Serialize};

/// One flight in the provider dataset.
///
/// `departure_time`/`arrival_time` are `YYYY-MM-DD HH:MM` local strings; the
/// matcher only ever looks at the date component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub airline: String,
    pub flight_number: String,
    pub from: String,
    pub to: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub price: i64,
    pub currency: String,
    pub available: bool,
}
