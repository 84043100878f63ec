//! The search request submitted by callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A flight-search request.
///
/// Immutable after creation; the wire shape (field names, `YYYY-MM-DD` date)
/// is shared by the HTTP boundary and the work-topic envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Origin airport code (e.g. "CGK").
    pub from: String,
    /// Destination airport code (e.g. "DPS").
    pub to: String,
    /// Travel date, `YYYY-MM-DD`.
    pub date: String,
    /// Number of passengers.
    #[serde(default)]
    pub passengers: u32,
}

impl SearchRequest {
    /// Validate a caller-supplied request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` describing the first offending field.
    pub fn validate(&self) -> DomainResult<()> {
        if !is_airport_code(&self.from) {
            return Err(DomainError::validation(
                "from must be a non-empty alphabetic airport code",
            ));
        }
        if !is_airport_code(&self.to) {
            return Err(DomainError::validation(
                "to must be a non-empty alphabetic airport code",
            ));
        }
        if NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").is_err() {
            return Err(DomainError::validation(format!(
                "date must be YYYY-MM-DD, got {:?}",
                self.date
            )));
        }
        if self.passengers == 0 {
            return Err(DomainError::validation("passengers must be at least 1"));
        }
        Ok(())
    }
}

fn is_airport_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphabetic())
}
