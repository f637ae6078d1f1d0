//! The raw-transport boundary and frame delimiting.
//!
//! The link layer needs exactly two things from the channel underneath it:
//! send bytes, and receive bytes within a timeout. [`Transport`] captures
//! that contract; everything else about the channel (serial line setup,
//! datagram sockets, fault injection) lives behind it.
//!
//! This module also owns [`read_frame`], which hunts a complete frame out of
//! the undelimited byte stream: the channel gives no message boundaries, so
//! the reader scans for the start marker, learns the frame's length from the
//! size byte, and collects the remainder — all under a single [`Deadline`].
//!
//! [`UdpTransport`] is the bundled concrete transport: a connected datagram
//! socket presented as a byte stream, useful for running two endpoints on
//! real machines or loopback.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::frame::START_BYTE;
use crate::timer::Deadline;

/// Largest chunk pulled from the socket in one read.
const MAX_DATAGRAM: usize = 2048;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Hard failures of the underlying channel.
///
/// A timeout is **not** an error — [`Transport::receive`] reports it as an
/// empty read, and the retry loops handle it. Anything here aborts the
/// current operation without consuming further retries.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying I/O error from the OS.
    Io(std::io::Error),
    /// The transport accepted fewer bytes than requested. A short write
    /// indicates a lower-layer malfunction, not a transient loss.
    ShortWrite { wanted: usize, sent: usize },
    /// The channel is gone (peer endpoint dropped).
    Closed,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "transport I/O error: {e}"),
            Self::ShortWrite { wanted, sent } => {
                write!(f, "short write: {sent} of {wanted} bytes sent")
            }
            Self::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// A byte-oriented, possibly lossy, possibly corrupting channel.
///
/// Implementations must honor `wait` natively in [`receive`]: when nothing
/// arrives within the window, return an empty buffer rather than blocking
/// past the deadline.
///
/// [`receive`]: Transport::receive
#[async_trait]
pub trait Transport: Send {
    /// Send `bytes`, returning how many were actually accepted.
    async fn transmit(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Receive up to `max_len` bytes, waiting at most `wait`.
    ///
    /// An empty buffer means the wait expired with nothing received.
    async fn receive(&mut self, max_len: usize, wait: Duration)
        -> Result<Vec<u8>, TransportError>;
}

// ---------------------------------------------------------------------------
// Frame delimiting
// ---------------------------------------------------------------------------

/// Extract one complete frame from the byte stream, waiting at most `wait`.
///
/// Scans byte-at-a-time for [`START_BYTE`] (leading garbage is discarded),
/// reads the size byte, then collects the declared remainder. The whole
/// operation shares one deadline: running out of time mid-frame yields
/// `Ok(None)`, the same as never seeing a start marker.
///
/// A declared size larger than `max_len` cannot be a frame this caller is
/// willing to accept; the read is abandoned and reported as `Ok(None)` so
/// the state machine falls through to its timeout path.
///
/// The returned bytes are the raw frame, ready for [`crate::frame::Frame::parse`]
/// — no validation happens here.
pub async fn read_frame<T: Transport + ?Sized>(
    transport: &mut T,
    max_len: usize,
    wait: Duration,
) -> Result<Option<Vec<u8>>, TransportError> {
    let deadline = Deadline::after(wait);

    // Hunt for the start marker, one byte at a time.
    loop {
        if deadline.expired() {
            return Ok(None);
        }
        let chunk = transport.receive(1, deadline.remaining()).await?;
        match chunk.first() {
            Some(&b) if b == START_BYTE => break,
            Some(_) => continue, // garbage between frames
            None => return Ok(None),
        }
    }

    // Size byte tells us how much more to collect.
    let chunk = transport.receive(1, deadline.remaining()).await?;
    let size = match chunk.first() {
        Some(&b) => b,
        None => return Ok(None),
    };
    let total = (size as usize).max(2); // never less than what we already hold
    if total > max_len {
        log::warn!("frame claims {total} bytes, caller accepts at most {max_len}; discarding");
        return Ok(None);
    }

    let mut frame = Vec::with_capacity(total);
    frame.push(START_BYTE);
    frame.push(size);
    while frame.len() < total {
        if deadline.expired() {
            log::warn!("timeout mid-frame, {} of {total} bytes received", frame.len());
            return Ok(None);
        }
        let chunk = transport
            .receive(total - frame.len(), deadline.remaining())
            .await?;
        if chunk.is_empty() {
            log::warn!("timeout mid-frame, {} of {total} bytes received", frame.len());
            return Ok(None);
        }
        frame.extend_from_slice(&chunk);
    }
    Ok(Some(frame))
}

// ---------------------------------------------------------------------------
// UdpTransport
// ---------------------------------------------------------------------------

/// A connected UDP socket presented as a byte-oriented [`Transport`].
///
/// Datagram payloads are spooled into an internal buffer so the frame reader
/// can consume them byte-at-a-time; leftover bytes survive across `receive`
/// calls exactly as they would on a serial line.
#[derive(Debug)]
pub struct UdpTransport {
    /// Address this endpoint is bound to.
    pub local_addr: SocketAddr,
    socket: UdpSocket,
    spool: VecDeque<u8>,
}

impl UdpTransport {
    /// Bind to `local` and connect to `peer`.
    ///
    /// Passing port 0 in `local` lets the OS choose an ephemeral port.
    pub async fn open(local: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            local_addr,
            socket,
            spool: VecDeque::new(),
        })
    }

    /// Re-target the peer address.
    ///
    /// Useful when the peer's ephemeral port is only learned after this end
    /// has bound its own socket.
    pub async fn set_peer(&mut self, peer: SocketAddr) -> Result<(), TransportError> {
        Ok(self.socket.connect(peer).await?)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn transmit(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        Ok(self.socket.send(bytes).await?)
    }

    async fn receive(
        &mut self,
        max_len: usize,
        wait: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        if self.spool.is_empty() {
            let mut scratch = [0u8; MAX_DATAGRAM];
            match tokio::time::timeout(wait, self.socket.recv(&mut scratch)).await {
                Err(_elapsed) => return Ok(Vec::new()),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(n)) => self.spool.extend(scratch[..n].iter().copied()),
            }
        }
        let n = max_len.min(self.spool.len());
        Ok(self.spool.drain(..n).collect())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, ACK_FRAME_LEN, MAX_FRAME_LEN};

    /// Feeds a canned byte stream to `read_frame`; empty script = timeout.
    struct ScriptedBytes {
        bytes: VecDeque<u8>,
    }

    impl ScriptedBytes {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedBytes {
        async fn transmit(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
            Ok(bytes.len())
        }

        async fn receive(
            &mut self,
            max_len: usize,
            _wait: Duration,
        ) -> Result<Vec<u8>, TransportError> {
            let n = max_len.min(self.bytes.len());
            Ok(self.bytes.drain(..n).collect())
        }
    }

    #[tokio::test]
    async fn reads_a_whole_frame() {
        let wire = Frame::build(b"abc", 2);
        let mut t = ScriptedBytes::new(&wire);
        let got = read_frame(&mut t, MAX_FRAME_LEN, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, wire);
        assert_eq!(Frame::parse(&got).unwrap().payload, b"abc");
    }

    #[tokio::test]
    async fn skips_leading_garbage() {
        let mut wire = vec![0x00, 0xFF, 0x42];
        wire.extend_from_slice(&Frame::build_ack(1));
        let mut t = ScriptedBytes::new(&wire);
        let got = read_frame(&mut t, ACK_FRAME_LEN, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Frame::parse(&got).unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn empty_stream_is_a_timeout() {
        let mut t = ScriptedBytes::new(&[]);
        let got = read_frame(&mut t, MAX_FRAME_LEN, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn truncated_stream_is_a_timeout() {
        let wire = Frame::build(b"abcdef", 0);
        let mut t = ScriptedBytes::new(&wire[..4]);
        let got = read_frame(&mut t, MAX_FRAME_LEN, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn oversized_claim_is_discarded() {
        // A data frame arriving where only an ack-sized frame is accepted.
        let wire = Frame::build(b"hello", 0);
        let mut t = ScriptedBytes::new(&wire);
        let got = read_frame(&mut t, 2 * ACK_FRAME_LEN, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn undersized_claim_yields_parse_fodder() {
        // Corrupted size byte smaller than the header: reader returns the two
        // bytes it holds, parse then rejects them.
        let wire = [START_BYTE, 1];
        let mut t = ScriptedBytes::new(&wire);
        let got = read_frame(&mut t, MAX_FRAME_LEN, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert!(Frame::parse(&got).is_err());
    }

    #[tokio::test]
    async fn udp_roundtrip_on_loopback() {
        let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let placeholder: SocketAddr = "127.0.0.1:9".parse().unwrap();

        // Bind both ends first, then cross-connect once ports are known.
        let mut a = UdpTransport::open(any, placeholder).await.unwrap();
        let mut b = UdpTransport::open(any, a.local_addr).await.unwrap();
        a.set_peer(b.local_addr).await.unwrap();

        let wire = Frame::build(b"ping", 0);
        assert_eq!(a.transmit(&wire).await.unwrap(), wire.len());
        let got = read_frame(&mut b, MAX_FRAME_LEN, Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, wire);
    }
}
