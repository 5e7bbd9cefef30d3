//! `PartialBytes` newtype for the partial-verification channel (spec.md §6: `PARTIALBYTES`).

use crate::error::{Error, Result};

/// Number of trailing plaintext hash bytes kept unmasked for partial
/// verification while locked. `0` disables the channel entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartialBytes(u8);

impl PartialBytes {
    /// # Examples
    ///
    /// ```rust
    /// use pph::domain::PartialBytes;
    ///
    /// let p = PartialBytes::new(2).unwrap();
    /// assert_eq!(*p, 2);
    ///
    /// let disabled = PartialBytes::new(0).unwrap();
    /// assert_eq!(*disabled, 0);
    /// ```
    pub fn new(value: u8) -> Result<Self> {
        if value as usize >= crate::digest::HASH_LEN {
            return Err(Error::Config(format!(
                "partial_bytes {value} must be smaller than the {}-byte hash",
                crate::digest::HASH_LEN
            )));
        }
        Ok(Self(value))
    }
}

impl std::ops::Deref for PartialBytes {
    type Target = u8;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
