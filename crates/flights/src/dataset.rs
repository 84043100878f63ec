//! Flight dataset loading.

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::flight::Flight;

/// Load the static flight dataset from a JSON file.
///
/// Loaded once per search invocation, matching how providers refresh their
/// inventory out of band.
///
/// # Errors
///
/// Fails when the file is unreadable or not a JSON array of flights.
pub fn load_flights(path: impl AsRef<Path>) -> anyhow::Result<Vec<Flight>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading flight dataset {}", path.display()))?;
    let flights: Vec<Flight> = serde_json::from_str(&data)
        .with_context(|| format!("parsing flight dataset {}", path.display()))?;
    Ok(flights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_the_bundled_dataset() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/flights.json");
        let flights = load_flights(path).unwrap();
        assert!(!flights.is_empty());
        assert!(flights.iter().any(|f| f.from == "CGK" && f.to == "DPS"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_flights("/definitely/not/here.json").is_err());
    }
}
