//! Cache module for memoizing registry results in memory
//!
//! This module provides a generic TTL cache and the background task that
//! sweeps its expired entries. Nothing is persisted; the cache lives and dies
//! with the process.

mod manager;
mod sweeper;

pub use manager::{CacheManager, CachedData, DEFAULT_TTL, MAX_TTL, MIN_SWEEP_INTERVAL};
pub use sweeper::SweeperHandle;
