//! Per-connection lifecycle and the public send/receive API.
//!
//! A [`Connection`] owns the complete state for one link endpoint: the
//! transport underneath it, the sequence counters, and the traffic
//! statistics. Its responsibilities are:
//! - Establishing fresh state on connect and reporting counters on
//!   disconnect.
//! - Delegating `send` to the ARQ-TX loop ([`crate::sender`]) and `receive`
//!   to the ARQ-RX loop ([`crate::receiver`]).
//! - Carrying the tunable protocol parameters ([`LinkConfig`]).
//!
//! A connection is used from one place at a time: `send` and `receive` take
//! `&mut self`, so sequence numbers and counters are serialized by ownership.
//! To drive traffic in both directions concurrently, run one connection per
//! direction (as the file-transfer peers do).

use std::time::Duration;

use crate::state::{LinkState, LinkStats};
use crate::transport::{Transport, TransportError};
use crate::{receiver, sender};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default sender wait for a response.
pub const DEFAULT_TX_WAIT: Duration = Duration::from_secs(4);
/// Default receiver wait for a frame.
pub const DEFAULT_RX_WAIT: Duration = Duration::from_secs(6);
/// Default retry budget, both ends.
pub const DEFAULT_MAX_TRIES: u32 = 5;

/// Tunable protocol parameters.
///
/// Both ends of a link must agree on the frame format constants (in
/// [`crate::frame`]); the values here only shape one endpoint's patience.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long the sender waits for a response to each transmission.
    pub tx_wait: Duration,
    /// How long the receiver waits for a frame on each attempt.
    pub rx_wait: Duration,
    /// Attempts before an operation gives up.
    pub max_tries: u32,
    /// When `false`, the acknowledgment exchange is skipped entirely:
    /// `send` succeeds after one transmission and `receive` accepts any
    /// well-formed frame without sequence checking. Loss goes unnoticed —
    /// useful only for exercising the layers below.
    pub ack_required: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            tx_wait: DEFAULT_TX_WAIT,
            rx_wait: DEFAULT_RX_WAIT,
            max_tries: DEFAULT_MAX_TRIES,
            ack_required: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Terminal outcomes of `send` / `receive`.
///
/// Timeouts and corrupt frames never appear here — they are absorbed by the
/// retry loops and only influence whether another attempt is made.
#[derive(Debug)]
pub enum LinkError {
    /// Caller handed over a block larger than the frame format allows.
    /// Checked before the transport is touched; never retried.
    BlockTooLarge { len: usize, max: usize },
    /// The channel reported a hard failure (not a timeout). Aborts the
    /// operation immediately without consuming further retries.
    Transport(TransportError),
    /// The retry budget ran out without success. Non-fatal: the caller
    /// decides whether to retry at a higher level or abandon the link.
    GiveUp { attempts: u32, sequence: u8 },
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockTooLarge { len, max } => {
                write!(f, "cannot send block of {len} bytes, max block size {max}")
            }
            Self::Transport(e) => write!(f, "transport failed: {e}"),
            Self::GiveUp { attempts, sequence } => {
                write!(f, "gave up after {attempts} attempts (sequence {sequence})")
            }
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for LinkError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One endpoint of a stop-and-wait link.
pub struct Connection<T: Transport> {
    /// Sequence tracking and traffic counters.
    pub state: LinkState,
    /// Protocol parameters for this endpoint.
    pub config: LinkConfig,
    transport: T,
}

impl<T: Transport> Connection<T> {
    /// Establish a connection over an already-opened transport, with default
    /// parameters.
    ///
    /// Opening the channel itself (and any failure doing so) belongs to the
    /// transport's constructor; once a transport exists, connecting is just
    /// initializing fresh state.
    pub fn connect(transport: T) -> Self {
        Self::with_config(transport, LinkConfig::default())
    }

    /// Establish a connection with explicit parameters.
    pub fn with_config(transport: T, config: LinkConfig) -> Self {
        log::info!("[link] connected");
        Self {
            state: LinkState::new(),
            config,
            transport,
        }
    }

    /// Send one data block reliably.
    ///
    /// Blocks (asynchronously) until the peer acknowledges, the retry budget
    /// is exhausted, or the transport fails hard. On success the transmit
    /// sequence number advances; on any failure it does not, so retrying with
    /// the identical block resends under the same sequence number.
    pub async fn send(&mut self, block: &[u8]) -> Result<(), LinkError> {
        sender::send_block(&mut self.transport, &mut self.state, &self.config, block).await
    }

    /// Receive the next new data block, truncated to `max_len` bytes.
    ///
    /// Duplicates of the previously delivered block are re-acknowledged but
    /// never delivered twice.
    pub async fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, LinkError> {
        receiver::receive_block(&mut self.transport, &mut self.state, &self.config, max_len)
            .await
    }

    /// Current traffic counters.
    pub fn stats(&self) -> &LinkStats {
        &self.state.stats
    }

    /// Tear down the connection and return the final traffic report.
    ///
    /// Consumes the connection, so use-after-disconnect cannot compile.
    pub fn disconnect(self) -> LinkStats {
        let mut stats = self.state.stats;
        stats.connected_for = self.state.connected_at.elapsed();
        log::info!("[link] disconnected: {stats}");
        stats
    }
}
