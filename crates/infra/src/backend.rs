//! Flight-search backend: the worker's domain-computation collaborator.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde_json::Value as JsonValue;
use tracing::debug;

use farestream_core::SearchRequest;
use farestream_flights::{find_matching_flights, load_flights};

use crate::worker::SearchBackend;

/// Matches flights from a static JSON dataset.
///
/// The dataset is loaded on every search (providers refresh inventory out of
/// band). Simulated latency is available for demos of the asynchronous
/// pipeline; it is off by default.
pub struct FlightSearchBackend {
    data_path: PathBuf,
    simulated_delay_secs: Option<(u64, u64)>,
}

impl FlightSearchBackend {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            simulated_delay_secs: None,
        }
    }

    /// Sleep uniformly within `lo..=hi` seconds before matching.
    pub fn with_simulated_delay(mut self, lo: u64, hi: u64) -> Self {
        self.simulated_delay_secs = Some((lo, hi.max(lo)));
        self
    }

    fn simulate_provider_latency(&self) {
        if let Some((lo, hi)) = self.simulated_delay_secs {
            let secs = rand::thread_rng().gen_range(lo..=hi);
            debug!(delay_secs = secs, "simulating provider latency");
            thread::sleep(Duration::from_secs(secs));
        }
    }
}

/// Simulated provider latency from `SIMULATE_DELAY_SECS` (`lo-hi` seconds),
/// shared by the binaries that wire a backend.
pub fn simulated_delay_from_env() -> Option<(u64, u64)> {
    let raw = std::env::var("SIMULATE_DELAY_SECS").ok()?;
    let (lo, hi) = raw.split_once('-')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

impl SearchBackend for FlightSearchBackend {
    fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<JsonValue>> {
        self.simulate_provider_latency();

        let all = load_flights(&self.data_path)?;
        let matched = find_matching_flights(&all, request);
        matched
            .into_iter()
            .map(|flight| serde_json::to_value(flight).map_err(Into::into))
            .collect()
    }
}
