//! In-process TTL cache with a background expiration sweeper.
//!
//! This crate provides a keyed store of short-lived values:
//! - Entries carry an absolute expiration timestamp (Unix seconds)
//! - A background task periodically sweeps out expired entries
//! - The sweeper can be stopped and its termination awaited
//!
//! Expiration is sweeper-driven only. Reads return an entry until the
//! sweeper (or [`TtlCache::cleanup_expired`]) removes it, so a value may
//! outlive its timestamp by up to one cleanup interval.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use ttl_cache::{TtlCache, unix_now};
//!
//! let cache = TtlCache::new(Duration::from_secs(15))?;
//! cache.add("John Doe".to_string(), 1, unix_now() + 3600);
//! assert_eq!(cache.read_by_id(1)?, "John Doe");
//! cache.shutdown().await;
//! ```

mod cache;
mod config;
mod entry;
mod error;
mod sweeper;

pub use cache::{CacheStats, TtlCache};
pub use config::{CacheConfig, DEFAULT_CLEANUP_INTERVAL};
pub use entry::unix_now;
pub use error::{Error, Result};
