//! Background Tasks Module
//!
//! Contains the background tasks owned by caches.
//!
//! # Tasks
//! - TTL Cleanup: removes expired entries at a configured interval

mod cleanup;

pub use cleanup::{spawn_cleanup_task, Reaper, StopOutcome, Sweep};
