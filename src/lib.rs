//! A threshold password-hashing store built on the PolyPasswordHasher
//! construction (spec.md §1): password verifiers are cryptographically
//! entangled with a master secret that can only be reconstructed once a
//! threshold number of accounts have logged in correctly.

pub mod codec;
pub mod digest;
pub mod domain;
pub mod error;
pub mod gf256;
pub mod hasher;
pub mod shamir;
pub mod state;
pub mod user_store;

pub use error::{Error, Result};
pub use hasher::{Hasher, Verification};
pub use state::{InMemoryKvCache, KvCache};
pub use user_store::{SweepReport, UserRecord, UserStore, UserSweeper};
