//! Per-connection mutable state: sequence tracking and traffic counters.
//!
//! One [`LinkState`] exists per [`crate::connection::Connection`] and is
//! owned by it exclusively — there is no process-wide state, so independent
//! connections never interfere and tests are deterministic. All mutation
//! happens through `&mut` access, which serializes counter updates by
//! construction.
//!
//! Sequence discipline (stop-and-wait):
//! - `tx_sequence` is the number the **next** outgoing data block will carry.
//!   It advances only after the sender confirms delivery.
//! - `last_accepted_rx` is the number of the most recently accepted inbound
//!   block, `None` until the first block is accepted. It advances only when
//!   the receiver accepts a new in-order block.

use std::time::{Duration, Instant};

use crate::frame::MOD_SEQNUM;

/// Advance a sequence number, wrapping at [`MOD_SEQNUM`].
#[inline]
pub fn next_seq(seq: u8) -> u8 {
    (seq + 1) % MOD_SEQNUM
}

// ---------------------------------------------------------------------------
// LinkState
// ---------------------------------------------------------------------------

/// Mutable state for one link-layer connection.
#[derive(Debug)]
pub struct LinkState {
    /// Sequence number for the next outgoing data block.
    pub tx_sequence: u8,
    /// Sequence number of the last accepted inbound data block, if any.
    pub last_accepted_rx: Option<u8>,
    /// Traffic counters, reset on connect and reported on disconnect.
    pub stats: LinkStats,
    /// When the connection was established, for the disconnect report.
    pub connected_at: Instant,
}

impl LinkState {
    /// Fresh state for a new connection: sequence 0, nothing accepted yet,
    /// all counters zero.
    pub fn new() -> Self {
        Self {
            tx_sequence: 0,
            last_accepted_rx: None,
            stats: LinkStats::default(),
            connected_at: Instant::now(),
        }
    }

    /// Sequence number the receiver expects for the next new data block.
    ///
    /// 0 before anything has been accepted, otherwise the successor of
    /// `last_accepted_rx`.
    pub fn expected_rx(&self) -> u8 {
        match self.last_accepted_rx {
            None => 0,
            Some(seq) => next_seq(seq),
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// LinkStats
// ---------------------------------------------------------------------------

/// Traffic counters for one connection.
///
/// Each counter is incremented exactly once per corresponding event and never
/// retroactively adjusted. The set mirrors the disconnect report: a single
/// connection may have been sending, receiving, or both, so all counters are
/// always present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Data frames transmitted (retransmissions included).
    pub frames_sent: u64,
    /// Positive acknowledgments transmitted.
    pub acks_sent: u64,
    /// Negative acknowledgments transmitted.
    pub naks_sent: u64,
    /// Responses classified as positive acknowledgments.
    pub acks_received: u64,
    /// Responses classified as negative or irrelevant acknowledgments.
    pub naks_received: u64,
    /// Frames that failed structural or checksum validation.
    pub bad_frames: u64,
    /// Frames that passed validation.
    pub good_frames: u64,
    /// Waits that expired without receiving anything.
    pub timeouts: u64,
    /// How long the connection was up; stamped at disconnect.
    pub connected_for: Duration,
}

impl std::fmt::Display for LinkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "link up {:.2}s: sent {} data frames",
            self.connected_for.as_secs_f64(),
            self.frames_sent
        )?;
        writeln!(
            f,
            "received {} good and {} bad frames, had {} timeouts",
            self.good_frames, self.bad_frames, self.timeouts
        )?;
        writeln!(f, "sent {} ACKs and {} NAKs", self.acks_sent, self.naks_sent)?;
        write!(
            f,
            "received {} ACKs and {} NAKs",
            self.acks_received, self.naks_received
        )
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
