//! ARQ-TX: the stop-and-wait send-side state machine.
//!
//! One logical block, one frame, one sequence number, at most one frame in
//! flight. The loop walks `Idle → AwaitingAck → {Success, GiveUp}`:
//!
//! ```text
//!   build frame (seq = tx_sequence)
//!        │
//!        ▼
//!   transmit ──short write──▶ TransportError (immediate, no retry)
//!        │
//!        ▼
//!   wait tx_wait for a response
//!        ├─ nothing ──────────── timeout++ ───┐
//!        ├─ corrupt ──────────── bad_frames++ ┤ retry same frame,
//!        ├─ wrong sequence ───── naks_rx++ ───┘ up to max_tries
//!        └─ matching sequence ── acks_rx++ ──▶ Success, advance seq
//! ```
//!
//! A retry resends the **identical** frame under the **same** sequence
//! number — this is a retransmission, not a new block. The sender does not
//! buffer blocks across calls: after a give-up the caller may retry the same
//! block, which reuses the unchanged `tx_sequence`.

use crate::connection::{LinkConfig, LinkError};
use crate::frame::{Frame, ACK_FRAME_LEN, MAX_BLOCK};
use crate::state::{next_seq, LinkState};
use crate::transport::{read_frame, Transport, TransportError};

/// Send one data block, retrying until acknowledged or out of budget.
///
/// See [`crate::connection::Connection::send`] for the caller-facing
/// contract. `state` is only advanced on success.
pub async fn send_block<T: Transport + ?Sized>(
    transport: &mut T,
    state: &mut LinkState,
    config: &LinkConfig,
    block: &[u8],
) -> Result<(), LinkError> {
    if block.len() > MAX_BLOCK {
        log::error!(
            "[tx] cannot send block of {} bytes, max block size {MAX_BLOCK}",
            block.len()
        );
        return Err(LinkError::BlockTooLarge {
            len: block.len(),
            max: MAX_BLOCK,
        });
    }

    let sequence = state.tx_sequence;
    let frame = Frame::build(block, sequence);
    let mut attempts = 0u32;
    let mut delivered = false;

    while !delivered && attempts < config.max_tries {
        let sent = transport.transmit(&frame).await?;
        if sent != frame.len() {
            // The layer below is broken, not lossy; retrying is pointless.
            log::error!("[tx] block {sequence}: short write, {sent} of {} bytes", frame.len());
            return Err(TransportError::ShortWrite {
                wanted: frame.len(),
                sent,
            }
            .into());
        }
        state.stats.frames_sent += 1;
        attempts += 1;
        log::debug!(
            "[tx] sent frame of {} bytes, block {sequence}, attempt {attempts}",
            frame.len()
        );

        if !config.ack_required {
            // Unacknowledged mode: one transmission is all there is.
            delivered = true;
            continue;
        }

        match read_frame(transport, 2 * ACK_FRAME_LEN, config.tx_wait).await? {
            None => {
                state.stats.timeouts += 1;
                log::debug!("[tx] timeout waiting for response to block {sequence}");
            }
            Some(bytes) => match Frame::parse(&bytes) {
                Err(e) => {
                    state.stats.bad_frames += 1;
                    log::debug!("[tx] corrupt response to block {sequence}: {e}");
                }
                Ok(response) if response.sequence == sequence => {
                    state.stats.good_frames += 1;
                    state.stats.acks_received += 1;
                    log::debug!("[tx] ack received, seq {}", response.sequence);
                    delivered = true;
                }
                Ok(response) => {
                    // A well-formed response for some other sequence: treat
                    // as negative and retransmit.
                    state.stats.good_frames += 1;
                    state.stats.naks_received += 1;
                    log::debug!(
                        "[tx] response carries seq {}, wanted {sequence}",
                        response.sequence
                    );
                }
            },
        }
    }

    if delivered {
        state.tx_sequence = next_seq(sequence);
        Ok(())
    } else {
        log::warn!("[tx] block {sequence}: tried {attempts} times, giving up");
        Err(LinkError::GiveUp { attempts, sequence })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
