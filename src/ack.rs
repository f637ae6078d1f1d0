//! Acknowledgment emission.
//!
//! The receiver answers every accepted (or re-recognized) data frame with a
//! minimal acknowledgment frame; the sender interprets the answer purely by
//! its sequence number. [`AckKind`] is therefore **local bookkeeping**: it
//! selects which counter the transmission is charged to and never appears on
//! the wire (the frame layout is fixed with an empty payload).
//!
//! A failed acknowledgment transmit is reported to the caller but must not
//! terminate its loop — an unacknowledged frame simply causes the peer to
//! time out and retransmit, which the receiver already handles.

use crate::frame::Frame;
use crate::state::LinkStats;
use crate::transport::{Transport, TransportError};

/// Whether an acknowledgment accepts or rejects the frame it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// The frame was accepted (or had already been accepted).
    Positive,
    /// The frame was rejected.
    Negative,
}

/// Build and transmit an acknowledgment carrying `sequence`.
///
/// On success the `acks_sent` or `naks_sent` counter is incremented according
/// to `kind`. A short write is a hard transport fault, reported like any
/// other transmit failure.
pub async fn send_ack<T: Transport + ?Sized>(
    transport: &mut T,
    stats: &mut LinkStats,
    kind: AckKind,
    sequence: u8,
) -> Result<(), TransportError> {
    let bytes = Frame::build_ack(sequence);
    let sent = transport.transmit(&bytes).await?;
    if sent != bytes.len() {
        return Err(TransportError::ShortWrite {
            wanted: bytes.len(),
            sent,
        });
    }
    match kind {
        AckKind::Positive => stats.acks_sent += 1,
        AckKind::Negative => stats.naks_sent += 1,
    }
    log::debug!("[rx] sent {kind:?} ack, seq {sequence}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Records everything transmitted; receive always times out.
    struct Sink {
        sent: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl Transport for Sink {
        async fn transmit(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
            self.sent.push(bytes.to_vec());
            Ok(bytes.len())
        }

        async fn receive(
            &mut self,
            _max_len: usize,
            _wait: Duration,
        ) -> Result<Vec<u8>, TransportError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn positive_ack_counts_and_carries_sequence() {
        let mut sink = Sink { sent: Vec::new() };
        let mut stats = LinkStats::default();
        send_ack(&mut sink, &mut stats, AckKind::Positive, 6)
            .await
            .unwrap();
        assert_eq!(stats.acks_sent, 1);
        assert_eq!(stats.naks_sent, 0);
        let frame = Frame::parse(&sink.sent[0]).unwrap();
        assert_eq!(frame.sequence, 6);
        assert!(frame.payload.is_empty());
    }

    #[tokio::test]
    async fn negative_ack_charges_the_nak_counter() {
        let mut sink = Sink { sent: Vec::new() };
        let mut stats = LinkStats::default();
        send_ack(&mut sink, &mut stats, AckKind::Negative, 2)
            .await
            .unwrap();
        assert_eq!(stats.acks_sent, 0);
        assert_eq!(stats.naks_sent, 1);
    }

    #[tokio::test]
    async fn short_write_reports_and_skips_counters() {
        struct Short;

        #[async_trait]
        impl Transport for Short {
            async fn transmit(&mut self, _bytes: &[u8]) -> Result<usize, TransportError> {
                Ok(1)
            }
            async fn receive(
                &mut self,
                _max_len: usize,
                _wait: Duration,
            ) -> Result<Vec<u8>, TransportError> {
                Ok(Vec::new())
            }
        }

        let mut stats = LinkStats::default();
        let err = send_ack(&mut Short, &mut stats, AckKind::Positive, 0).await;
        assert!(matches!(err, Err(TransportError::ShortWrite { .. })));
        assert_eq!(stats.acks_sent, 0);
    }
}
