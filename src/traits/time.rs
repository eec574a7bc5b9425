//! Clock abstraction for testable, time-dependent lifecycle logic.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current Unix timestamp.
///
/// Listing transitions stamp their timestamps through this trait, and the
/// minimum-bidding-time check on `sell` reads it, so a test can hold or
/// advance the clock at will.
pub trait TimeProvider: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now_unix(&self) -> u64;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl SystemTimeProvider {
    pub const fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}
