//! Wire-format definitions for link-layer frames.
//!
//! Every unit exchanged over the transport is a frame. This module is
//! responsible for:
//! - Defining the on-wire binary layout (markers, size, sequence, checksum).
//! - Building a frame around a data block ready for transmission.
//! - Parsing a raw byte sequence back into a [`Frame`], returning a tagged
//!   error for malformed or corrupted input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! The channel is byte-oriented with no inherent message boundaries, so the
//! frame carries its own delimiters and an explicit total length:
//!
//! ```text
//! +-------+-------+-------+----------------+----------+-------+
//! | start | size  |  seq  |  payload ...   | checksum |  end  |
//! |  212  | 1 byte| 1 byte|   0..=200 B    |  1 byte  |  204  |
//! +-------+-------+-------+----------------+----------+-------+
//! ```
//!
//! `size` is the total frame length in bytes (header + payload + trailer).
//! `checksum = (seq + size + sum(payload bytes)) mod 251`. Acknowledgment
//! frames use the same envelope with an empty payload ([`ACK_FRAME_LEN`]
//! bytes total).

// ---------------------------------------------------------------------------
// Protocol constants (both ends must agree on all of these)
// ---------------------------------------------------------------------------

/// Start-of-frame marker byte.
pub const START_BYTE: u8 = 212;
/// End-of-frame marker byte.
pub const END_BYTE: u8 = 204;

/// Byte length of the frame header: start marker, frame size, sequence.
pub const HEADER_LEN: usize = 3;
/// Byte length of the frame trailer: checksum, end marker.
pub const TRAILER_LEN: usize = 2;

/// Largest number of data bytes allowed in one frame.
///
/// Bounded by the one-byte `size` field: `HEADER_LEN + MAX_BLOCK + TRAILER_LEN`
/// must fit in a `u8`.
pub const MAX_BLOCK: usize = 200;
/// Optimum number of data bytes in a frame, advertised to the layer above.
pub const OPT_BLOCK: usize = 70;

/// Modulo for sequence numbers; valid sequence numbers are `0..MOD_SEQNUM`.
pub const MOD_SEQNUM: u8 = 16;
/// Modulus for the one-byte checksum.
pub const CHECKSUM_MODULUS: u32 = 251;

/// Total length of an acknowledgment frame (empty payload).
pub const ACK_FRAME_LEN: usize = HEADER_LEN + TRAILER_LEN;
/// Total length of the largest legal frame.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_BLOCK + TRAILER_LEN;

// Byte offsets of the header fields.
const OFF_START: usize = 0;
const OFF_SIZE: usize = 1;
const OFF_SEQ: usize = 2;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A decoded link-layer frame: sequence number plus payload bytes.
///
/// The markers, size, and checksum are validated during [`Frame::parse`] and
/// not stored — a `Frame` value is well-formed by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number carried in the header, in `[0, MOD_SEQNUM)`.
    pub sequence: u8,
    /// Data bytes; empty for acknowledgment frames.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build the byte sequence for a data frame around `payload`.
    ///
    /// Callers must reject oversized blocks before calling; this is
    /// debug-asserted here. Deterministic, no side effects.
    pub fn build(payload: &[u8], sequence: u8) -> Vec<u8> {
        debug_assert!(
            payload.len() <= MAX_BLOCK,
            "payload of {} bytes exceeds MAX_BLOCK ({MAX_BLOCK})",
            payload.len()
        );
        let size = (HEADER_LEN + payload.len() + TRAILER_LEN) as u8;
        let mut buf = Vec::with_capacity(size as usize);
        buf.push(START_BYTE);
        buf.push(size);
        buf.push(sequence);
        buf.extend_from_slice(payload);
        buf.push(checksum(sequence, size, payload));
        buf.push(END_BYTE);
        buf
    }

    /// Build the byte sequence for a minimal acknowledgment frame.
    ///
    /// Same envelope as [`Frame::build`] with an empty payload. The positive
    /// or negative meaning of an ack is not encoded on the wire; the peer
    /// infers it from the carried sequence number (see `crate::ack`).
    pub fn build_ack(sequence: u8) -> Vec<u8> {
        Self::build(&[], sequence)
    }

    /// Parse and validate a frame from a raw byte slice.
    ///
    /// Checks run in a fixed order and the error reports the **first**
    /// failure: minimum length, start marker, declared size against the
    /// actual byte count, sequence range, checksum, end marker. A frame that
    /// fails any check is never partially decoded.
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN + TRAILER_LEN {
            return Err(FrameError::TooShort { len: buf.len() });
        }
        if buf[OFF_START] != START_BYTE {
            return Err(FrameError::NoStartMarker { found: buf[OFF_START] });
        }
        let size = buf[OFF_SIZE];
        if size as usize != buf.len() {
            return Err(FrameError::SizeMismatch {
                declared: size,
                actual: buf.len(),
            });
        }
        let sequence = buf[OFF_SEQ];
        if sequence >= MOD_SEQNUM {
            // A parsed sequence number must be usable in modular arithmetic
            // downstream; anything else is wire corruption.
            return Err(FrameError::SequenceOutOfRange { found: sequence });
        }
        let payload = &buf[HEADER_LEN..buf.len() - TRAILER_LEN];
        let carried = buf[buf.len() - 2];
        let computed = checksum(sequence, size, payload);
        if carried != computed {
            return Err(FrameError::ChecksumMismatch { carried, computed });
        }
        if buf[buf.len() - 1] != END_BYTE {
            return Err(FrameError::NoEndMarker {
                found: buf[buf.len() - 1],
            });
        }
        Ok(Frame {
            sequence,
            payload: payload.to_vec(),
        })
    }
}

/// One-byte additive checksum over the sequence, frame size, and payload.
fn checksum(sequence: u8, size: u8, payload: &[u8]) -> u8 {
    let mut sum = u32::from(sequence) + u32::from(size);
    for &b in payload {
        sum += u32::from(b);
    }
    (sum % CHECKSUM_MODULUS) as u8
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a received byte sequence is not a valid frame.
///
/// Tagged with the first failing check so corrupt traffic can be diagnosed;
/// all variants are handled identically by the retry loops (count and drop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the smallest legal frame.
    TooShort { len: usize },
    /// First byte is not [`START_BYTE`].
    NoStartMarker { found: u8 },
    /// Declared frame size disagrees with the received byte count.
    SizeMismatch { declared: u8, actual: usize },
    /// Sequence field is not in `[0, MOD_SEQNUM)`.
    SequenceOutOfRange { found: u8 },
    /// Recomputed checksum differs from the carried one.
    ChecksumMismatch { carried: u8, computed: u8 },
    /// Last byte is not [`END_BYTE`].
    NoEndMarker { found: u8 },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::TooShort { len } => {
                write!(f, "frame too short ({len} bytes)")
            }
            FrameError::NoStartMarker { found } => {
                write!(f, "no start marker (first byte {found})")
            }
            FrameError::SizeMismatch { declared, actual } => {
                write!(f, "size field says {declared} bytes, got {actual}")
            }
            FrameError::SequenceOutOfRange { found } => {
                write!(f, "sequence {found} outside [0, {MOD_SEQNUM})")
            }
            FrameError::ChecksumMismatch { carried, computed } => {
                write!(f, "checksum mismatch (carried {carried}, computed {computed})")
            }
            FrameError::NoEndMarker { found } => {
                write!(f, "no end marker (last byte {found})")
            }
        }
    }
}

impl std::error::Error for FrameError {}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
