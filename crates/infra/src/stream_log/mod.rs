//! Infrastructure stream-log implementations.
//!
//! The transport abstraction lives in `farestream-streams` as pure
//! mechanics (together with the in-memory implementation); this module
//! provides the infrastructure-backed ones.

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use redis::RedisStreamLog;
