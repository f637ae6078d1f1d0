//! `arq-link` — reliable delivery of discrete data blocks over an
//! unreliable, byte-oriented, error-prone channel.
//!
//! # Architecture
//!
//! ```text
//!  ┌─────────────┐  send(block)             receive(max) ┌─────────────┐
//!  │ Application │─────────────┐       ┌────────────────▶│ Application │
//!  └─────────────┘             ▼       │                 └─────────────┘
//!                        ┌──────────────────┐
//!                        │    Connection    │
//!                        │ (owns LinkState) │
//!                        └───┬──────────┬───┘
//!              data frames   │          │   acks
//!                   ┌────────▼──┐   ┌───▼───────┐
//!                   │  Sender   │   │ Receiver  │──▶ ack emitter
//!                   │ (ARQ-TX)  │   │ (ARQ-RX)  │
//!                   └────────┬──┘   └───┬───────┘
//!                            │  frames  │
//!                        ┌───▼──────────▼───┐
//!                        │    Transport     │ (byte channel with timeout)
//!                        └──────────────────┘
//! ```
//!
//! The protocol is stop-and-wait ARQ: one frame in flight, every data frame
//! answered by an acknowledgment, retransmission on timeout, duplicate
//! suppression by modular sequence numbers, and a bounded retry budget.
//!
//! Each module has a single responsibility:
//! - [`frame`]      — wire format (build / parse, checksum, constants)
//! - [`state`]      — per-connection sequence tracking and traffic counters
//! - [`timer`]      — deadline helper for waits spanning partial reads
//! - [`transport`]  — raw-channel trait, frame delimiting, UDP transport
//! - [`simulator`]  — seeded fault injection (bit errors, loss) for testing
//! - [`ack`]        — acknowledgment emission and counter attribution
//! - [`sender`]     — ARQ-TX retry loop
//! - [`receiver`]   — ARQ-RX accept / duplicate / stale loop
//! - [`connection`] — lifecycle, configuration, public send/receive API

pub mod ack;
pub mod connection;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod simulator;
pub mod state;
pub mod timer;
pub mod transport;

pub use connection::{Connection, LinkConfig, LinkError};
pub use frame::{Frame, FrameError};
pub use simulator::{FaultConfig, FaultyTransport};
pub use state::{LinkState, LinkStats};
pub use transport::{Transport, TransportError, UdpTransport};

/// Optimum number of data bytes per block for this protocol.
///
/// A protocol constant independent of any particular connection, advertised
/// so the layer above can chunk its data sensibly.
pub fn optimal_block_size() -> usize {
    frame::OPT_BLOCK
}
