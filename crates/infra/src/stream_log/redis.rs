//! Redis Streams-backed stream log (durable, at-least-once delivery).
//!
//! Maps the transport contract onto Redis Streams primitives:
//! - `append` → XADD (auto id) + EXPIRE (retention refresh)
//! - `ensure_group` → XGROUP CREATE … MKSTREAM (BUSYGROUP swallowed)
//! - `read_group` → XREADGROUP GROUP … BLOCK … COUNT … with `>`
//! - `ack` → XACK, `exists` → EXISTS, `len` → XLEN, `delete` → DEL
//!
//! Pending-entry redelivery after the lease timeout is Redis's own consumer
//! group bookkeeping; this client does not reimplement it.

use std::sync::Arc;
use std::time::Duration;

use redis::streams::{StreamReadOptions, StreamReadReply};

use farestream_streams::{
    FieldMap, StartFrom, StreamEntry, StreamLog, TransportError, TransportResult,
};

/// Topic retention window, refreshed on every append.
const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct RedisStreamLog {
    client: Arc<redis::Client>,
    retention: Duration,
}

impl RedisStreamLog {
    /// Create a stream log over the given Redis URL
    /// (e.g. `redis://localhost:6379`).
    ///
    /// # Errors
    ///
    /// Fails when the URL does not parse; connections are established
    /// per operation.
    pub fn new(redis_url: impl AsRef<str>) -> TransportResult<Self> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            retention: DEFAULT_RETENTION,
        })
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Fresh connection per operation: blocking group reads hold a
    /// connection for seconds at a time, so worker and reader threads must
    /// not share one.
    fn conn(&self) -> TransportResult<redis::Connection> {
        self.client
            .get_connection()
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }
}

impl StreamLog for RedisStreamLog {
    fn append(&self, topic: &str, fields: &FieldMap) -> TransportResult<String> {
        let mut conn = self.conn()?;

        let mut cmd = redis::cmd("XADD");
        cmd.arg(topic).arg("*");
        for (name, value) in fields {
            cmd.arg(name).arg(value);
        }
        let id: String = cmd
            .query(&mut conn)
            .map_err(|e| TransportError::Command(format!("XADD failed: {e}")))?;

        // Best-effort retention refresh; the append already succeeded.
        let _: Result<i64, _> = redis::cmd("EXPIRE")
            .arg(topic)
            .arg(self.retention.as_secs())
            .query(&mut conn);

        Ok(id)
    }

    fn ensure_group(&self, topic: &str, group: &str, start: StartFrom) -> TransportResult<()> {
        let mut conn = self.conn()?;

        let start_id = match start {
            StartFrom::Beginning => "0",
            StartFrom::Latest => "$",
        };
        let created: Result<String, redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(topic)
            .arg(group)
            .arg(start_id)
            .arg("MKSTREAM")
            .query(&mut conn);

        match created {
            Ok(_) => Ok(()),
            // Existing group: creation is idempotent.
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(TransportError::Command(format!("XGROUP CREATE failed: {e}"))),
        }
    }

    fn read_group(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        block: Duration,
        count: usize,
    ) -> TransportResult<Vec<StreamEntry>> {
        let mut conn = self.conn()?;

        let options = StreamReadOptions::default()
            .group(group, consumer)
            .count(count)
            .block(block.as_millis() as usize);

        let reply: Option<StreamReadReply> = redis::Commands::xread_options(
            &mut conn,
            &[topic],
            &[">"],
            &options,
        )
        .map_err(|e| TransportError::Command(format!("XREADGROUP failed: {e}")))?;

        let Some(reply) = reply else {
            // Blocking timeout: nothing yet.
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for key in reply.keys.into_iter().filter(|k| k.key == topic) {
            for id in key.ids {
                let mut fields = FieldMap::new();
                for (name, value) in id.map {
                    match redis::from_redis_value::<String>(&value) {
                        Ok(raw) => {
                            fields.insert(name, raw);
                        }
                        Err(e) => {
                            return Err(TransportError::Command(format!(
                                "non-string field {name} in entry {}: {e}",
                                id.id
                            )));
                        }
                    }
                }
                entries.push(StreamEntry { id: id.id, fields });
            }
        }
        Ok(entries)
    }

    fn ack(&self, topic: &str, group: &str, entry_id: &str) -> TransportResult<()> {
        let mut conn = self.conn()?;
        // XACK of an unknown or already-acked id returns 0; that is a no-op,
        // not an error.
        let _: u64 = redis::cmd("XACK")
            .arg(topic)
            .arg(group)
            .arg(entry_id)
            .query(&mut conn)
            .map_err(|e| TransportError::Command(format!("XACK failed: {e}")))?;
        Ok(())
    }

    fn exists(&self, topic: &str) -> TransportResult<bool> {
        let mut conn = self.conn()?;
        redis::cmd("EXISTS")
            .arg(topic)
            .query(&mut conn)
            .map_err(|e| TransportError::Command(format!("EXISTS failed: {e}")))
    }

    fn len(&self, topic: &str) -> TransportResult<u64> {
        let mut conn = self.conn()?;
        redis::cmd("XLEN")
            .arg(topic)
            .query(&mut conn)
            .map_err(|e| TransportError::Command(format!("XLEN failed: {e}")))
    }

    fn delete(&self, topic: &str) -> TransportResult<()> {
        let mut conn = self.conn()?;
        let _: u64 = redis::cmd("DEL")
            .arg(topic)
            .query(&mut conn)
            .map_err(|e| TransportError::Command(format!("DEL failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_malformed_url() {
        assert!(RedisStreamLog::new("definitely not a url").is_err());
    }

    #[test]
    fn retention_is_configurable() {
        let log = RedisStreamLog::new("redis://localhost:6379")
            .unwrap()
            .with_retention(Duration::from_secs(60));
        assert_eq!(log.retention, Duration::from_secs(60));
    }
}
