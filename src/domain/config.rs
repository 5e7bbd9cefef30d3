//! Validated engine configuration (spec.md §6): the five enumerated
//! settings plus the cross-field checks spec.md §7's `ConfigError` row
//! demands. Construction happens once, at `Hasher::new`, and is fatal.

use super::{PartialBytes, Threshold};
use crate::digest::HASH_LEN;
use crate::error::{Error, Result};

pub const DEFAULT_SECRET_LEN: usize = 32; // 256 bits, matching the AES-256 key (spec.md §6)
pub const DEFAULT_SECRET_VERIFICATION_BYTES: usize = 4;
pub const DEFAULT_ITERATIONS: u32 = 12_000;

/// Aggregates `THRESHOLD`, `PARTIALBYTES`, `SECRET_LENGTH`,
/// `SECRET_VERIFICATION_BYTES`, and `ITERATIONS` (spec.md §6), enforcing the
/// invariants that keep the fingerprint recoverable through the
/// partial-byte-truncated wire format (see SPEC_FULL.md §4.4–§4.8).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    threshold: Threshold,
    partial_bytes: PartialBytes,
    secret_len: usize,
    secret_verification_bytes: usize,
    iterations: u32,
}

impl EngineConfig {
    /// # Examples
    ///
    /// ```rust
    /// use pph::domain::{EngineConfig, PartialBytes, Threshold};
    ///
    /// let config = EngineConfig::new(
    ///     Threshold::new(3).unwrap(),
    ///     PartialBytes::new(2).unwrap(),
    ///     32,
    ///     4,
    ///     12_000,
    /// ).unwrap();
    /// assert_eq!(config.usable_secret_len(), 30);
    /// ```
    pub fn new(
        threshold: Threshold,
        partial_bytes: PartialBytes,
        secret_len: usize,
        secret_verification_bytes: usize,
        iterations: u32,
    ) -> Result<Self> {
        if secret_len > HASH_LEN {
            return Err(Error::Config(format!(
                "secret_len {secret_len} exceeds the {HASH_LEN}-byte AES-256 key width"
            )));
        }
        if *partial_bytes as usize >= secret_len {
            return Err(Error::Config(format!(
                "partial_bytes {} leaves no room for a secret within secret_len {secret_len}",
                *partial_bytes
            )));
        }
        let usable = secret_len - *partial_bytes as usize;
        if secret_verification_bytes >= usable {
            return Err(Error::Config(format!(
                "secret_verification_bytes {secret_verification_bytes} must be smaller than the \
                 {usable}-byte recoverable prefix (secret_len - partial_bytes)"
            )));
        }
        if iterations == 0 {
            return Err(Error::Config("iterations must be positive".into()));
        }

        Ok(Self {
            threshold,
            partial_bytes,
            secret_len,
            secret_verification_bytes,
            iterations,
        })
    }

    /// Default configuration: `THRESHOLD=3`, matching a realistic minimal
    /// deployment; callers pick their own threshold in practice.
    pub fn with_threshold(threshold: Threshold) -> Result<Self> {
        Self::new(
            threshold,
            PartialBytes::new(2).expect("2 < HASH_LEN"),
            DEFAULT_SECRET_LEN,
            DEFAULT_SECRET_VERIFICATION_BYTES,
            DEFAULT_ITERATIONS,
        )
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn partial_bytes(&self) -> PartialBytes {
        self.partial_bytes
    }

    pub fn secret_len(&self) -> usize {
        self.secret_len
    }

    /// `secret_len - partial_bytes`: the prefix of the secret buffer that the
    /// password-login recovery path can ever reconstruct (see
    /// SPEC_FULL.md §4.4–§4.8's resolved design decision).
    pub fn usable_secret_len(&self) -> usize {
        self.secret_len - *self.partial_bytes as usize
    }

    pub fn secret_verification_bytes(&self) -> usize {
        self.secret_verification_bytes
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}
