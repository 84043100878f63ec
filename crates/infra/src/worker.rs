//! Worker loop: pull searches from the work topic, publish result envelopes.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use farestream_core::SearchRequest;
use farestream_observability::continue_trace;
use farestream_streams::{
    PROVIDER_GROUP, SEARCH_REQUESTED_TOPIC, SearchJob, SearchUpdate, StartFrom, StreamEntry,
    StreamLog, TransportError, from_fields, result_topic, to_fields,
};

use crate::current_carrier;

/// Pause before retrying a failed work-topic read.
const READ_RETRY_DELAY: Duration = Duration::from_secs(1);

/// The domain-computation seam.
///
/// Implementations may take a variable, multi-second amount of time; the
/// worker runs each search on its own thread so a slow one never delays
/// polling for the next.
pub trait SearchBackend: Send + Sync {
    /// Execute one search, returning the matched records as JSON values.
    ///
    /// # Errors
    ///
    /// Any error here fails the search; the caller publishes the terminal
    /// `failed` envelope.
    fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<JsonValue>>;
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Consumer group shared by all worker instances.
    pub group: String,
    /// This instance's consumer name within the group.
    pub consumer: String,
    /// Blocking read timeout per poll.
    pub block: Duration,
    /// Max entries per poll.
    pub batch: usize,
    /// Upper bound on one search's backend execution.
    pub job_timeout: Duration,
    /// Name for the poll thread and logging.
    pub name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            group: PROVIDER_GROUP.to_string(),
            consumer: format!("provider-{}", Uuid::now_v7()),
            block: Duration::from_secs(5),
            batch: 10,
            job_timeout: Duration::from_secs(30),
            name: "search-worker".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    pub fn with_job_timeout(mut self, job_timeout: Duration) -> Self {
        self.job_timeout = job_timeout;
        self
    }
}

/// Handle to control and join a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the poll loop to stop.
    ///
    /// In-flight search threads are not awaited; their envelopes either land
    /// or are lost (at-most-one-attempt).
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Search worker: one instance per process, many instances may run
/// concurrently sharing one consumer group on the work topic.
pub struct SearchWorker {
    log: Arc<dyn StreamLog>,
    backend: Arc<dyn SearchBackend>,
    config: WorkerConfig,
}

impl SearchWorker {
    pub fn new(log: Arc<dyn StreamLog>, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            log,
            backend,
            config: WorkerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the shared group and spawn the poll thread.
    ///
    /// # Errors
    ///
    /// Group setup failure is fatal: the process cannot proceed without its
    /// consumer group. ("Group already exists" is not a failure.)
    pub fn start(self) -> Result<WorkerHandle, TransportError> {
        self.log
            .ensure_group(SEARCH_REQUESTED_TOPIC, &self.config.group, StartFrom::Beginning)?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let name = self.config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || worker_loop(self, shutdown_rx))
            .expect("failed to spawn search worker thread");

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(worker: SearchWorker, shutdown_rx: mpsc::Receiver<()>) {
    info!(worker = %worker.config.name, "search worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let batch = match worker.log.read_group(
            SEARCH_REQUESTED_TOPIC,
            &worker.config.group,
            &worker.config.consumer,
            worker.config.block,
            worker.config.batch,
        ) {
            Ok(batch) => batch,
            Err(err) => {
                error!(worker = %worker.config.name, error = %err, "work topic read failed");
                thread::sleep(READ_RETRY_DELAY);
                continue;
            }
        };

        for entry in batch {
            // One thread per search, so a slow backend never delays the next
            // poll. The entry is acked after the routine returns, success or
            // not: at-most-one-attempt.
            let log = worker.log.clone();
            let backend = worker.backend.clone();
            let group = worker.config.group.clone();
            let job_timeout = worker.config.job_timeout;
            thread::spawn(move || {
                handle_entry(&log, backend, &entry, job_timeout);
                if let Err(err) = log.ack(SEARCH_REQUESTED_TOPIC, &group, &entry.id) {
                    error!(entry_id = %entry.id, error = %err, "failed to ack work entry");
                }
            });
        }
    }

    info!(worker = %worker.config.name, "search worker stopped");
}

fn handle_entry(
    log: &Arc<dyn StreamLog>,
    backend: Arc<dyn SearchBackend>,
    entry: &StreamEntry,
    job_timeout: Duration,
) {
    let job: SearchJob = match from_fields(&entry.fields) {
        Ok(job) => job,
        Err(err) => {
            warn!(entry_id = %entry.id, error = %err, "discarding undecodable work envelope");
            return;
        }
    };

    let span = info_span!("handle_search", search_id = %job.search_id);
    continue_trace(&span, job.trace_context.as_ref());
    let _guard = span.enter();

    let search_id = job.search_id;
    let topic = result_topic(&search_id);

    if let Err(err) = publish(log, &topic, &SearchUpdate::processing(search_id, current_carrier())) {
        error!(error = %err, "failed to publish processing update");
        return;
    }

    match run_with_timeout(backend, job.request(), job_timeout) {
        Ok(results) => {
            let total = results.len() as u64;
            info!(total_results = total, "search completed");

            let payload = JsonValue::Array(results);
            if let Err(err) = publish(
                log,
                &topic,
                &SearchUpdate::completed(search_id, payload, current_carrier()),
            ) {
                error!(error = %err, "failed to publish results payload");
                return;
            }
            if let Err(err) = publish(
                log,
                &topic,
                &SearchUpdate::total(search_id, total, current_carrier()),
            ) {
                error!(error = %err, "failed to publish terminal update");
            }
        }
        Err(err) => {
            warn!(error = %err, "search handling failed");
            if let Err(publish_err) = publish(
                log,
                &topic,
                &SearchUpdate::failed(search_id, err.to_string(), current_carrier()),
            ) {
                error!(error = %publish_err, "failed to publish failure update");
            }
        }
    }
}

/// Run the backend on its own thread, bounded by `job_timeout`.
///
/// On timeout the computation thread is left to finish detached; its result
/// is discarded, and only the worker ever publishes to the result topic, so
/// a late completion cannot resurrect a reclaimed topic.
fn run_with_timeout(
    backend: Arc<dyn SearchBackend>,
    request: SearchRequest,
    job_timeout: Duration,
) -> anyhow::Result<Vec<JsonValue>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(backend.search(&request));
    });

    match rx.recv_timeout(job_timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(anyhow::anyhow!("search timed out after {job_timeout:?}"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(anyhow::anyhow!("search backend panicked"))
        }
    }
}

fn publish(log: &Arc<dyn StreamLog>, topic: &str, update: &SearchUpdate) -> anyhow::Result<()> {
    let fields = to_fields(update)?;
    log.append(topic, &fields)?;
    Ok(())
}
