//! Infrastructure wiring behind the HTTP handlers.

use std::sync::Arc;

use farestream_infra::{
    FlightSearchBackend, RedisStreamLog, ResultStreamReader, SearchIntake, SearchWorker,
    WorkerHandle, simulated_delay_from_env,
};
use farestream_streams::{InMemoryStreamLog, StreamLog};

/// Runtime configuration for the API process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Redis transport when set; in-memory transport with an in-process
    /// worker otherwise (dev/test mode).
    pub redis_url: Option<String>,
    /// Flight dataset served by the dev-mode worker.
    pub data_path: String,
    /// Simulated provider latency for the dev-mode worker, `lo..=hi` seconds.
    pub simulated_delay_secs: Option<(u64, u64)>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL").ok(),
            data_path: std::env::var("FLIGHT_DATA")
                .unwrap_or_else(|_| "data/flights.json".to_string()),
            simulated_delay_secs: simulated_delay_from_env(),
        }
    }
}

pub struct AppServices {
    pub intake: SearchIntake,
    pub reader: ResultStreamReader,
    /// Dev-mode in-process worker, kept alive for the process lifetime.
    _worker: Option<WorkerHandle>,
}

pub fn build_services(config: AppConfig) -> AppServices {
    match &config.redis_url {
        Some(url) => {
            let log: Arc<dyn StreamLog> =
                Arc::new(RedisStreamLog::new(url).expect("invalid REDIS_URL"));
            tracing::info!("using Redis stream transport");
            AppServices {
                intake: SearchIntake::new(log.clone()),
                reader: ResultStreamReader::new(log),
                _worker: None,
            }
        }
        None => {
            // Dev/test wiring: the whole pipeline runs in-process.
            let log: Arc<dyn StreamLog> = Arc::new(InMemoryStreamLog::new());

            let mut backend = FlightSearchBackend::new(&config.data_path);
            if let Some((lo, hi)) = config.simulated_delay_secs {
                backend = backend.with_simulated_delay(lo, hi);
            }

            let worker = SearchWorker::new(log.clone(), Arc::new(backend))
                .start()
                .expect("in-memory group setup failed");

            tracing::info!("using in-memory transport with in-process worker");
            AppServices {
                intake: SearchIntake::new(log.clone()),
                reader: ResultStreamReader::new(log),
                _worker: Some(worker),
            }
        }
    }
}
