//! `farestream-flights` — the flight-matching domain collaborator.
//!
//! A pure function over a static dataset; no transport concerns.

pub mod dataset;
pub mod flight;
pub mod matching;

pub use dataset::load_flights;
pub use flight::Flight;
pub use matching::find_matching_flights;
