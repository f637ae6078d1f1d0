//! Cooperative deadline tracking for bounded waits.
//!
//! A frame is assembled from several partial transport reads, all of which
//! must share **one** time budget: the deadline is computed when the wait
//! begins and each subsequent read gets only the remaining time. [`Deadline`]
//! captures that fixed point in the future.
//!
//! The protocol uses fixed waits (`tx_wait` / `rx_wait` in
//! [`crate::connection::LinkConfig`]); there is no round-trip-time estimation
//! or exponential back-off, since stop-and-wait retransmits at a constant
//! cadence.

use std::time::{Duration, Instant};

/// A fixed point in time after which a wait is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            expires_at: Instant::now() + limit,
        }
    }

    /// `true` once the deadline has been reached or passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
