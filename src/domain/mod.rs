//! Validated configuration newtypes (spec.md §6):
//! - [`Threshold`] — `THRESHOLD`, minimum shares required for reconstruction (2..=255)
//! - [`PartialBytes`] — `PARTIALBYTES`, trailing plaintext verification bytes
//! - [`ShareNumber`] — a share identifier (0 = thresholdless, 1..=255 = threshold)
//! - [`EngineConfig`] — the validated aggregate of all five settings

mod config;
mod partial_bytes;
mod share_number;
mod threshold;

pub use config::EngineConfig;
pub use partial_bytes::PartialBytes;
pub use share_number::ShareNumber;
pub use threshold::Threshold;
