//! Configuration constants for the marketplace engine.
//!
//! This module centralizes the listing validation bounds so they are tuned
//! in one place.

use std::time::Duration;

/// Maximum length of a listing title, in characters.
pub const TITLE_MAX_LEN: usize = 50;

/// Maximum length of a listing description, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Shortest minimum bidding time a draft listing may be configured with.
pub const MIN_BIDDING_TIME_FLOOR: Duration = Duration::from_secs(60);

/// Number of random bytes in a listing UID (hex-encoded to twice as many
/// characters). 128 bits makes collisions astronomically unlikely; the
/// marketplace still checks and retries.
pub const LISTING_UID_LEN: usize = 16;
