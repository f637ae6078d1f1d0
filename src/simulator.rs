//! Fault-injecting transport wrapper for deterministic testing.
//!
//! Real channels corrupt and lose bytes. To exercise the retransmission
//! machinery without a genuinely noisy serial line, [`FaultyTransport`] wraps
//! any [`Transport`] and applies a configurable fault model:
//!
//! | Fault      | Description                                               |
//! |------------|-----------------------------------------------------------|
//! | Bit errors | Each received byte has one bit flipped with probability   |
//! |            | `byte_error_rate`.                                        |
//! | Loss       | A transmit is silently swallowed with probability         |
//! |            | `loss_rate` (reported as fully sent, nothing on the wire).|
//!
//! The RNG is seeded, so a failing test replays identically.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transport::{Transport, TransportError};

/// Configuration for the fault model.
///
/// Probabilities are in `[0.0, 1.0]`; the default injects no faults.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability that any given received byte gets one bit flipped.
    pub byte_error_rate: f64,
    /// Probability that a transmitted buffer is silently dropped.
    pub loss_rate: f64,
    /// RNG seed; equal seeds replay equal fault sequences.
    pub seed: u64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            byte_error_rate: 0.0,
            loss_rate: 0.0,
            seed: 0,
        }
    }
}

/// A fault-injecting wrapper around another transport.
#[derive(Debug)]
pub struct FaultyTransport<T> {
    inner: T,
    config: FaultConfig,
    rng: StdRng,
}

impl<T: Transport> FaultyTransport<T> {
    /// Wrap `inner` with the given fault model.
    pub fn new(inner: T, config: FaultConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { inner, config, rng }
    }

    /// Take back the wrapped transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for FaultyTransport<T> {
    async fn transmit(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        if self.config.loss_rate > 0.0 && self.rng.gen_bool(self.config.loss_rate) {
            log::debug!("[sim] dropped a {}-byte transmit", bytes.len());
            return Ok(bytes.len()); // swallowed: looks sent, never arrives
        }
        self.inner.transmit(bytes).await
    }

    async fn receive(
        &mut self,
        max_len: usize,
        wait: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let mut bytes = self.inner.receive(max_len, wait).await?;
        if self.config.byte_error_rate > 0.0 {
            for b in bytes.iter_mut() {
                if self.rng.gen_bool(self.config.byte_error_rate) {
                    let bit = self.rng.gen_range(0..8);
                    *b ^= 1 << bit;
                    log::debug!("[sim] flipped bit {bit} of a received byte");
                }
            }
        }
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
