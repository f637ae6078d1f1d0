//! ARQ-RX: the stop-and-wait receive-side state machine.
//!
//! The loop walks `Idle → AwaitingFrame → {Delivered, GiveUp}`, classifying
//! every well-formed frame by its sequence number against the last accepted
//! one:
//!
//! | sequence                   | action                                      |
//! |----------------------------|---------------------------------------------|
//! | expected (`last + 1`)      | accept, ack it, deliver upward              |
//! | last accepted (duplicate)  | re-ack it, do **not** re-deliver, keep waiting |
//! | anything else (stale)      | re-ack the last known-good, keep waiting    |
//!
//! The duplicate row is what keeps stop-and-wait alive: when the peer's
//! acknowledgment is lost, the peer retransmits a block this side already
//! delivered. Re-acking lets the peer's sender complete; suppressing the
//! payload keeps delivery at-most-once. Corrupt frames are counted and
//! dropped without a response — their sequence field cannot be trusted, and
//! the peer's timeout already drives the retransmission.

use crate::ack::{send_ack, AckKind};
use crate::connection::{LinkConfig, LinkError};
use crate::frame::{Frame, MAX_FRAME_LEN};
use crate::state::LinkState;
use crate::transport::{read_frame, Transport};

/// Receive the next new data block, truncated to `max_len` bytes.
///
/// See [`crate::connection::Connection::receive`] for the caller-facing
/// contract. `state.last_accepted_rx` advances only when a new in-order
/// block is accepted.
pub async fn receive_block<T: Transport + ?Sized>(
    transport: &mut T,
    state: &mut LinkState,
    config: &LinkConfig,
    max_len: usize,
) -> Result<Vec<u8>, LinkError> {
    let expected = state.expected_rx();
    let mut attempts = 0u32;

    while attempts < config.max_tries {
        attempts += 1;

        let bytes = match read_frame(transport, MAX_FRAME_LEN, config.rx_wait).await? {
            Some(bytes) => bytes,
            None => {
                // Nothing arrived, so there is nothing to acknowledge.
                state.stats.timeouts += 1;
                log::debug!("[rx] timeout waiting for frame, attempt {attempts}");
                continue;
            }
        };
        log::debug!("[rx] got frame, {} bytes, attempt {attempts}", bytes.len());

        let frame = match Frame::parse(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                state.stats.bad_frames += 1;
                log::debug!("[rx] bad frame: {e}");
                continue;
            }
        };
        state.stats.good_frames += 1;

        if !config.ack_required {
            // Unacknowledged mode: accept anything well-formed, no response.
            state.last_accepted_rx = Some(frame.sequence);
            let mut payload = frame.payload;
            payload.truncate(max_len);
            return Ok(payload);
        }

        if frame.sequence == expected {
            // The new in-order block.
            log::debug!(
                "[rx] received block {} with {} data bytes",
                frame.sequence,
                frame.payload.len()
            );
            state.last_accepted_rx = Some(frame.sequence);
            if let Err(e) =
                send_ack(transport, &mut state.stats, AckKind::Positive, frame.sequence).await
            {
                // The peer will time out and retransmit; we answer the
                // duplicate then.
                log::warn!("[rx] failed to ack block {}: {e}", frame.sequence);
            }
            let mut payload = frame.payload;
            payload.truncate(max_len);
            return Ok(payload);
        } else if Some(frame.sequence) == state.last_accepted_rx {
            // Exact duplicate of the block already delivered: the peer missed
            // our acknowledgment. Regenerate it, deliver nothing.
            log::debug!(
                "[rx] duplicate of block {}, re-acking without re-delivery",
                frame.sequence
            );
            if let Err(e) =
                send_ack(transport, &mut state.stats, AckKind::Positive, frame.sequence).await
            {
                log::warn!("[rx] failed to re-ack block {}: {e}", frame.sequence);
            }
        } else {
            // Anomalous under strict stop-and-wait. Re-assert the last
            // sequence this side accepted so the peer can resynchronize.
            log::debug!(
                "[rx] unexpected block {}, expected {expected}",
                frame.sequence
            );
            if let Some(last) = state.last_accepted_rx {
                if let Err(e) =
                    send_ack(transport, &mut state.stats, AckKind::Positive, last).await
                {
                    log::warn!("[rx] failed to re-ack block {last}: {e}");
                }
            }
        }
    }

    log::warn!("[rx] tried to receive a frame {attempts} times, giving up");
    Err(LinkError::GiveUp {
        attempts,
        sequence: expected,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::transport::TransportError;
    use std::collections::VecDeque;
    use std::time::Duration;

    fn test_config() -> LinkConfig {
        LinkConfig {
            tx_wait: Duration::from_millis(10),
            rx_wait: Duration::from_millis(10),
            ..LinkConfig::default()
        }
    }

    /// Plays back canned inbound byte chunks; records outbound acks.
    struct Scripted {
        inbound: VecDeque<Vec<u8>>,
        pending: VecDeque<u8>,
        acked: Vec<u8>, // sequence numbers of acks we sent
    }

    impl Scripted {
        fn new(inbound: Vec<Vec<u8>>) -> Self {
            Self {
                inbound: inbound.into(),
                pending: VecDeque::new(),
                acked: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn transmit(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
            self.acked.push(Frame::parse(bytes).unwrap().sequence);
            Ok(bytes.len())
        }

        async fn receive(
            &mut self,
            max_len: usize,
            _wait: Duration,
        ) -> Result<Vec<u8>, TransportError> {
            if self.pending.is_empty() {
                match self.inbound.pop_front() {
                    Some(r) => self.pending.extend(r),
                    None => return Ok(Vec::new()),
                }
            }
            let n = max_len.min(self.pending.len());
            Ok(self.pending.drain(..n).collect())
        }
    }

    #[tokio::test]
    async fn delivers_expected_block_and_acks_it() {
        let mut t = Scripted::new(vec![Frame::build(b"hello", 0)]);
        let mut state = LinkState::new();
        let got = receive_block(&mut t, &mut state, &test_config(), 16)
            .await
            .unwrap();
        assert_eq!(got, b"hello");
        assert_eq!(state.last_accepted_rx, Some(0));
        assert_eq!(t.acked, vec![0]);
        assert_eq!(state.stats.good_frames, 1);
        assert_eq!(state.stats.acks_sent, 1);
    }

    #[tokio::test]
    async fn truncates_to_max_len() {
        let mut t = Scripted::new(vec![Frame::build(b"hello world", 0)]);
        let mut state = LinkState::new();
        let got = receive_block(&mut t, &mut state, &test_config(), 5)
            .await
            .unwrap();
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn duplicate_is_reacked_but_not_redelivered() {
        // Block 0 arrives, then three duplicates of it, then block 1: the
        // peer may retransmit any number of times before catching an ack.
        let mut t = Scripted::new(vec![
            Frame::build(b"first", 0),
            Frame::build(b"first", 0),
            Frame::build(b"first", 0),
            Frame::build(b"first", 0),
            Frame::build(b"second", 1),
        ]);
        let mut state = LinkState::new();
        let config = test_config();

        let first = receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        assert_eq!(first, b"first");

        // Every duplicate must be absorbed inside this call, which returns
        // only the *next* new block.
        let second = receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        assert_eq!(second, b"second");

        // One ack per physical receipt: block 0, its three duplicates, block 1.
        assert_eq!(t.acked, vec![0, 0, 0, 0, 1]);
        assert_eq!(state.stats.acks_sent, 5);
        assert_eq!(state.stats.good_frames, 5);
        assert_eq!(state.last_accepted_rx, Some(1));
    }

    #[tokio::test]
    async fn stale_frame_reacks_last_known_good() {
        let mut t = Scripted::new(vec![
            Frame::build(b"first", 0),
            Frame::build(b"stale", 9), // neither expected (1) nor duplicate (0)
            Frame::build(b"second", 1),
        ]);
        let mut state = LinkState::new();
        let config = test_config();

        receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        let got = receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        assert_eq!(got, b"second");
        // The stale frame provoked a re-ack of sequence 0.
        assert_eq!(t.acked, vec![0, 0, 1]);
        assert_eq!(state.last_accepted_rx, Some(1));
    }

    #[tokio::test]
    async fn stale_frame_before_first_accept_sends_nothing() {
        let mut t = Scripted::new(vec![
            Frame::build(b"stale", 9),
            Frame::build(b"first", 0),
        ]);
        let mut state = LinkState::new();
        let got = receive_block(&mut t, &mut state, &test_config(), 16)
            .await
            .unwrap();
        assert_eq!(got, b"first");
        // No sequence had been accepted when the stale frame arrived, so the
        // only ack is for block 0.
        assert_eq!(t.acked, vec![0]);
    }

    #[tokio::test]
    async fn corrupt_frame_counted_and_dropped_silently() {
        let mut corrupted = Frame::build(b"junk", 0);
        let len = corrupted.len();
        corrupted[len - 2] ^= 0x01; // checksum byte
        let mut t = Scripted::new(vec![corrupted, Frame::build(b"good", 0)]);
        let mut state = LinkState::new();
        let got = receive_block(&mut t, &mut state, &test_config(), 16)
            .await
            .unwrap();
        assert_eq!(got, b"good");
        assert_eq!(state.stats.bad_frames, 1);
        assert_eq!(t.acked, vec![0]); // nothing sent for the corrupt frame
    }

    #[tokio::test]
    async fn silence_gives_up_after_budget() {
        let mut t = Scripted::new(vec![]);
        let mut state = LinkState::new();
        let config = test_config();
        let err = receive_block(&mut t, &mut state, &config, 16).await;
        match err {
            Err(LinkError::GiveUp { attempts, sequence }) => {
                assert_eq!(attempts, config.max_tries);
                assert_eq!(sequence, 0);
            }
            other => panic!("expected GiveUp, got {other:?}"),
        }
        assert_eq!(state.stats.timeouts, u64::from(config.max_tries));
        assert!(t.acked.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_sequence_is_dropped_as_corruption() {
        // The sequence byte feeds modular arithmetic once stored, so a frame
        // carrying an illegal value must never reach the accept path — not
        // even in unacknowledged mode, which skips sequence checking.
        let mut t = Scripted::new(vec![
            Frame::build(b"junk", 255),
            Frame::build(b"ok", 3),
            Frame::build(b"next", 4),
        ]);
        let mut state = LinkState::new();
        let config = LinkConfig {
            ack_required: false,
            ..test_config()
        };

        let got = receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        assert_eq!(got, b"ok");
        assert_eq!(state.stats.bad_frames, 1);
        assert_eq!(state.last_accepted_rx, Some(3));

        // The stored sequence is in range, so the follow-up call works.
        let got = receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        assert_eq!(got, b"next");
    }

    #[tokio::test]
    async fn unacknowledged_mode_accepts_any_sequence_silently() {
        let mut t = Scripted::new(vec![Frame::build(b"data", 9)]);
        let mut state = LinkState::new();
        let config = LinkConfig {
            ack_required: false,
            ..test_config()
        };
        let got = receive_block(&mut t, &mut state, &config, 16).await.unwrap();
        assert_eq!(got, b"data");
        assert!(t.acked.is_empty());
    }
}
