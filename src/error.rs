//! Typed error surface for the engine (spec.md §7).
//!
//! `Locked` is deliberately absent here: it is modeled as a `Verification`
//! result variant (see [`crate::hasher::Verification`]) rather than an error,
//! per Design Note 3. `SecurityEvent` is absent too — it is logged, not
//! returned (see §4.12 of SPEC_FULL.md).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed encoded verifier: {0}")]
    Parse(String),

    #[error("candidate share {share} conflicts with a previously cached value")]
    ShareConflict { share: u8 },

    #[error("shamir consistency audit failed across {checked} surplus share(s)")]
    RecoverMismatch { checked: usize },

    #[error("recovered secret failed the fingerprint check")]
    SecretFingerprintFailed,

    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("insufficient shares: need {needed}, got {got}")]
    InsufficientShares { needed: u8, got: usize },

    #[error("duplicate share index {0} among recovery inputs")]
    DuplicateShare(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
