//! Provider worker: pulls search jobs from the work topic, publishes result
//! envelopes. Many instances may run concurrently sharing one consumer group.

use std::sync::Arc;

use farestream_infra::{
    FlightSearchBackend, RedisStreamLog, SearchWorker, simulated_delay_from_env,
};
use farestream_streams::StreamLog;

#[tokio::main]
async fn main() {
    farestream_observability::init("farestream-provider");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let data_path =
        std::env::var("FLIGHT_DATA").unwrap_or_else(|_| "data/flights.json".to_string());

    let log: Arc<dyn StreamLog> =
        Arc::new(RedisStreamLog::new(&redis_url).expect("invalid REDIS_URL"));

    let mut backend = FlightSearchBackend::new(&data_path);
    if let Some((lo, hi)) = simulated_delay_from_env() {
        tracing::info!(lo, hi, "simulating provider latency");
        backend = backend.with_simulated_delay(lo, hi);
    }

    let worker = SearchWorker::new(log, Arc::new(backend))
        .start()
        .expect("failed to create work-topic consumer group");

    tracing::info!("provider service started");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    worker.shutdown();
    farestream_observability::shutdown();
}
