//! Integration tests for the full submit → work topic → worker → result
//! topic → reader pipeline, over the in-memory transport.
//!
//! Verifies:
//! - every submitted identity is attachable, before and after processing
//! - the processing → completed(results) → completed(total) sequence
//! - terminal envelopes reclaim the topic and make re-attachment NOT_FOUND
//! - work entries are acked exactly once, success or failure
//! - unrelated searches never cross-deliver

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;

use farestream_core::{SearchId, SearchRequest};
use farestream_streams::{
    CancelToken, FieldMap, InMemoryStreamLog, PROVIDER_GROUP, SEARCH_REQUESTED_TOPIC, StartFrom,
    StreamEntry, StreamLog, TransportError, TransportResult, result_topic,
};

use crate::backend::FlightSearchBackend;
use crate::intake::{IntakeError, SearchIntake};
use crate::reader::{AttachError, ReaderExit, ResultEvent, ResultStreamReader};
use crate::worker::{SearchBackend, SearchWorker, WorkerConfig, WorkerHandle};

const POLL: Duration = Duration::from_millis(50);

fn dataset() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/flights.json")
}

fn request(to: &str) -> SearchRequest {
    SearchRequest {
        from: "CGK".to_string(),
        to: to.to_string(),
        date: "2025-07-10".to_string(),
        passengers: 2,
    }
}

fn setup(log: Arc<InMemoryStreamLog>) -> (SearchIntake, ResultStreamReader) {
    let log: Arc<dyn StreamLog> = log;
    (
        SearchIntake::new(log.clone()),
        ResultStreamReader::new(log).with_block(POLL),
    )
}

fn start_worker(log: Arc<InMemoryStreamLog>, backend: Arc<dyn SearchBackend>) -> WorkerHandle {
    SearchWorker::new(log, backend)
        .with_config(
            WorkerConfig::default()
                .with_name("test-worker")
                .with_block(POLL)
                .with_job_timeout(Duration::from_secs(2)),
        )
        .start()
        .unwrap()
}

/// Follow a search's stream to its end, collecting envelope events.
/// A watchdog cancels after 10 s so a broken pipeline fails instead of
/// hanging the test.
fn collect_stream(reader: &ResultStreamReader, search_id: &SearchId) -> (Vec<JsonValue>, ReaderExit) {
    let sub = reader.attach(search_id).unwrap();
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(10));
            cancel.cancel();
        });
    }

    let mut events = Vec::new();
    let exit = sub.run(&cancel, |event| {
        if let ResultEvent::Update(value) = event {
            events.push(value);
        }
        true
    });
    (events, exit)
}

#[test]
fn submitted_search_streams_processing_then_results_then_total() {
    let log = Arc::new(InMemoryStreamLog::new());
    let (intake, reader) = setup(log.clone());
    let worker = start_worker(log.clone(), Arc::new(FlightSearchBackend::new(dataset())));

    let search_id = intake.submit(&request("DPS")).unwrap();
    let (events, exit) = collect_stream(&reader, &search_id);
    worker.shutdown();

    assert_eq!(exit, ReaderExit::Completed);
    assert_eq!(events.len(), 3);

    assert_eq!(events[0]["status"], "processing");
    assert_eq!(events[0]["results"], serde_json::json!([]));
    assert_eq!(events[0]["search_id"], search_id.to_string());

    assert_eq!(events[1]["status"], "completed");
    let results = events[1]["results"].as_array().unwrap();
    assert!(!results.is_empty());
    for flight in results {
        assert_eq!(flight["from"], "CGK");
        assert_eq!(flight["to"], "DPS");
        assert!(
            flight["departure_time"]
                .as_str()
                .unwrap()
                .starts_with("2025-07-10")
        );
    }

    assert_eq!(events[2]["status"], "completed");
    assert_eq!(events[2]["total_results"], serde_json::json!(results.len()));

    // Terminal envelope reclaimed the topic: the identity is gone for good.
    assert!(!log.exists(&result_topic(&search_id)).unwrap());
    assert!(matches!(
        reader.attach(&search_id),
        Err(AttachError::NotFound)
    ));
}

#[test]
fn attach_for_an_unknown_identity_is_not_found() {
    let log = Arc::new(InMemoryStreamLog::new());
    let (_intake, reader) = setup(log);

    assert!(matches!(
        reader.attach(&SearchId::new()),
        Err(AttachError::NotFound)
    ));
}

#[test]
fn attach_before_any_result_streams_with_zero_events() {
    let log = Arc::new(InMemoryStreamLog::new());
    let (intake, reader) = setup(log);

    // No worker running: the search stays unprocessed.
    let search_id = intake.submit(&request("DPS")).unwrap();
    let sub = reader.attach(&search_id).unwrap();

    let cancel = CancelToken::new();
    let mut updates = 0usize;
    let mut idles = 0usize;
    let exit = sub.run(&cancel, |event| match event {
        ResultEvent::Update(_) => {
            updates += 1;
            true
        }
        ResultEvent::Idle => {
            idles += 1;
            idles < 3
        }
    });

    assert_eq!(exit, ReaderExit::Cancelled);
    assert_eq!(updates, 0);
}

#[test]
fn work_entries_are_acked_exactly_once_even_when_handling_fails() {
    struct FailingBackend;
    impl SearchBackend for FailingBackend {
        fn search(&self, _request: &SearchRequest) -> anyhow::Result<Vec<JsonValue>> {
            anyhow::bail!("provider offline")
        }
    }

    // Short lease so an unacked entry would come back immediately.
    let log = Arc::new(InMemoryStreamLog::with_redelivery(Duration::from_millis(25)));
    let (intake, reader) = setup(log.clone());
    let worker = start_worker(log.clone(), Arc::new(FailingBackend));

    let search_id = intake.submit(&request("DPS")).unwrap();
    let (events, exit) = collect_stream(&reader, &search_id);
    worker.shutdown();

    // The caller learns about the loss through the terminal failure...
    assert_eq!(exit, ReaderExit::Completed);
    let last = events.last().unwrap();
    assert_eq!(last["status"], "failed");
    assert!(last["error"].as_str().unwrap().contains("provider offline"));

    // ...and the work entry does not come back: it was acked despite the
    // failure (at-most-one-attempt).
    std::thread::sleep(Duration::from_millis(50));
    let redelivered = log
        .read_group(
            SEARCH_REQUESTED_TOPIC,
            PROVIDER_GROUP,
            "probe",
            Duration::from_millis(10),
            10,
        )
        .unwrap();
    assert!(redelivered.is_empty());
}

#[test]
fn two_searches_stream_independently() {
    let log = Arc::new(InMemoryStreamLog::new());
    let (intake, reader) = setup(log.clone());
    let worker = start_worker(log.clone(), Arc::new(FlightSearchBackend::new(dataset())));

    let dps = intake.submit(&request("DPS")).unwrap();
    let sub = intake.submit(&request("SUB")).unwrap();
    assert_ne!(dps, sub);

    let (dps_events, dps_exit) = collect_stream(&reader, &dps);
    let (sub_events, sub_exit) = collect_stream(&reader, &sub);
    worker.shutdown();

    assert_eq!(dps_exit, ReaderExit::Completed);
    assert_eq!(sub_exit, ReaderExit::Completed);

    for event in &dps_events {
        assert_eq!(event["search_id"], dps.to_string());
    }
    for event in &sub_events {
        assert_eq!(event["search_id"], sub.to_string());
    }

    let dps_results = dps_events[1]["results"].as_array().unwrap();
    assert!(dps_results.iter().all(|f| f["to"] == "DPS"));
    let sub_results = sub_events[1]["results"].as_array().unwrap();
    assert!(sub_results.iter().all(|f| f["to"] == "SUB"));
}

#[test]
fn transport_failure_means_not_submitted() {
    struct DownLog;
    impl StreamLog for DownLog {
        fn append(&self, _: &str, _: &FieldMap) -> TransportResult<String> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
        fn ensure_group(&self, _: &str, _: &str, _: StartFrom) -> TransportResult<()> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
        fn read_group(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: Duration,
            _: usize,
        ) -> TransportResult<Vec<StreamEntry>> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
        fn ack(&self, _: &str, _: &str, _: &str) -> TransportResult<()> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
        fn exists(&self, _: &str) -> TransportResult<bool> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
        fn len(&self, _: &str) -> TransportResult<u64> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
        fn delete(&self, _: &str) -> TransportResult<()> {
            Err(TransportError::Unavailable("connection refused".into()))
        }
    }

    let intake = SearchIntake::new(Arc::new(DownLog));
    let err = intake.submit(&request("DPS")).unwrap_err();
    assert!(matches!(err, IntakeError::Transport(_)));
}
