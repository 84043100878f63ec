//! In-memory stream log for tests/dev.
//!
//! Reproduces the consumer-group semantics the components rely on: per-group
//! cursors, pending lists with lease-timeout redelivery, blocking reads, and
//! idempotent ack/delete. No IO; a condvar wakes blocked readers on append.
//! Retention is not enforced — dev topics live for the process lifetime.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::log::{FieldMap, StartFrom, StreamEntry, StreamLog, TransportError, TransportResult};

const DEFAULT_REDELIVER_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Pending {
    consumer: String,
    delivered_at: Instant,
    index: usize,
}

#[derive(Debug, Default)]
struct Group {
    /// Index of the next not-yet-delivered entry.
    cursor: usize,
    /// Delivered-but-unacknowledged entries, by entry id.
    pending: HashMap<String, Pending>,
}

#[derive(Debug, Default)]
struct Topic {
    entries: Vec<StreamEntry>,
    next_seq: u64,
    groups: HashMap<String, Group>,
}

#[derive(Debug)]
pub struct InMemoryStreamLog {
    topics: Mutex<HashMap<String, Topic>>,
    appended: Condvar,
    redeliver_after: Duration,
}

impl Default for InMemoryStreamLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStreamLog {
    pub fn new() -> Self {
        Self::with_redelivery(DEFAULT_REDELIVER_AFTER)
    }

    /// Override the pending-entry lease timeout (tests exercise redelivery
    /// with a short lease).
    pub fn with_redelivery(redeliver_after: Duration) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            appended: Condvar::new(),
            redeliver_after,
        }
    }

    fn take_batch(
        topic: &mut Topic,
        group_name: &str,
        consumer: &str,
        count: usize,
        redeliver_after: Duration,
    ) -> TransportResult<Vec<StreamEntry>> {
        let group = topic
            .groups
            .get_mut(group_name)
            .ok_or_else(|| TransportError::Command(format!("no such group: {group_name}")))?;

        // Expired pending entries first: reassign their lease to this
        // consumer and redeliver, oldest first.
        let now = Instant::now();
        let mut expired: Vec<(String, usize)> = group
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.delivered_at) >= redeliver_after)
            .map(|(id, p)| (id.clone(), p.index))
            .collect();
        expired.sort_by_key(|(_, index)| *index);
        expired.truncate(count);

        if !expired.is_empty() {
            let mut batch = Vec::with_capacity(expired.len());
            for (id, index) in expired {
                let pending = group.pending.get_mut(&id).unwrap();
                if pending.consumer != consumer {
                    pending.consumer = consumer.to_string();
                }
                pending.delivered_at = now;
                batch.push(topic.entries[index].clone());
            }
            return Ok(batch);
        }

        // Otherwise hand out new entries from the cursor.
        let mut batch = Vec::new();
        while group.cursor < topic.entries.len() && batch.len() < count {
            let index = group.cursor;
            let entry = topic.entries[index].clone();
            group.pending.insert(
                entry.id.clone(),
                Pending {
                    consumer: consumer.to_string(),
                    delivered_at: now,
                    index,
                },
            );
            group.cursor += 1;
            batch.push(entry);
        }
        Ok(batch)
    }
}

impl StreamLog for InMemoryStreamLog {
    fn append(&self, topic: &str, fields: &FieldMap) -> TransportResult<String> {
        let mut topics = self.topics.lock().unwrap();
        let topic = topics.entry(topic.to_string()).or_default();
        topic.next_seq += 1;
        let id = format!("{}-0", topic.next_seq);
        topic.entries.push(StreamEntry {
            id: id.clone(),
            fields: fields.clone(),
        });
        self.appended.notify_all();
        Ok(id)
    }

    fn ensure_group(&self, topic: &str, group: &str, start: StartFrom) -> TransportResult<()> {
        let mut topics = self.topics.lock().unwrap();
        let topic = topics.entry(topic.to_string()).or_default();
        if !topic.groups.contains_key(group) {
            let cursor = match start {
                StartFrom::Beginning => 0,
                StartFrom::Latest => topic.entries.len(),
            };
            topic.groups.insert(
                group.to_string(),
                Group {
                    cursor,
                    pending: HashMap::new(),
                },
            );
        }
        Ok(())
    }

    fn read_group(
        &self,
        topic_name: &str,
        group: &str,
        consumer: &str,
        block: Duration,
        count: usize,
    ) -> TransportResult<Vec<StreamEntry>> {
        let deadline = Instant::now() + block;
        let mut topics = self.topics.lock().unwrap();
        loop {
            let topic = topics
                .get_mut(topic_name)
                .ok_or_else(|| TransportError::Command(format!("no such topic: {topic_name}")))?;
            let batch = Self::take_batch(topic, group, consumer, count, self.redeliver_after)?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }
            let (guard, timeout) = self.appended.wait_timeout(topics, remaining).unwrap();
            topics = guard;
            if timeout.timed_out() {
                // One last non-blocking look, then give up until the next poll.
                let topic = topics.get_mut(topic_name).ok_or_else(|| {
                    TransportError::Command(format!("no such topic: {topic_name}"))
                })?;
                return Self::take_batch(topic, group, consumer, count, self.redeliver_after);
            }
        }
    }

    fn ack(&self, topic: &str, group: &str, entry_id: &str) -> TransportResult<()> {
        let mut topics = self.topics.lock().unwrap();
        if let Some(topic) = topics.get_mut(topic) {
            if let Some(group) = topic.groups.get_mut(group) {
                group.pending.remove(entry_id);
            }
        }
        Ok(())
    }

    fn exists(&self, topic: &str) -> TransportResult<bool> {
        Ok(self.topics.lock().unwrap().contains_key(topic))
    }

    fn len(&self, topic: &str) -> TransportResult<u64> {
        let topics = self.topics.lock().unwrap();
        Ok(topics.get(topic).map_or(0, |t| t.entries.len() as u64))
    }

    fn delete(&self, topic: &str) -> TransportResult<()> {
        let mut topics = self.topics.lock().unwrap();
        topics.remove(topic);
        // Wake blocked readers so they observe the missing topic.
        self.appended.notify_all();
        Ok(())
    }
}
