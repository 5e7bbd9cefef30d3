//! Bit-exact serialization of the encoded verifier string (spec.md §4.3).
//!
//! ```text
//! <algorithm> "$" <share-or-neg> "$" <iterations> "$" <salt> "$" <passhash>
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::{Error, Result};

pub const ALGORITHM: &str = "pph";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVerifier {
    pub algorithm: String,
    /// Retains a leading `-` when present; spec.md §3's locked-mode marker.
    pub raw_share: String,
    pub iterations: u32,
    pub salt: String,
    pub passhash: String,
}

pub fn encode_verifier(share_field: &str, iterations: u32, salt: &str, passhash: &str) -> String {
    format!("{ALGORITHM}${share_field}${iterations}${salt}${passhash}")
}

/// Split on `$` exactly 4 times, matching spec.md §4.3.
pub fn decode_verifier(s: &str) -> Result<EncodedVerifier> {
    let mut parts = s.splitn(5, '$');
    let algorithm = parts.next().ok_or_else(|| Error::Parse(s.to_string()))?;
    let raw_share = parts.next().ok_or_else(|| Error::Parse(s.to_string()))?;
    let iterations = parts.next().ok_or_else(|| Error::Parse(s.to_string()))?;
    let salt = parts.next().ok_or_else(|| Error::Parse(s.to_string()))?;
    let passhash = parts.next().ok_or_else(|| Error::Parse(s.to_string()))?;
    if parts.next().is_some() {
        return Err(Error::Parse(s.to_string()));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| Error::Parse(format!("non-numeric iterations field: {iterations}")))?;

    Ok(EncodedVerifier {
        algorithm: algorithm.to_string(),
        raw_share: raw_share.to_string(),
        iterations,
        salt: salt.to_string(),
        passhash: passhash.to_string(),
    })
}

/// `b64`: the text variant (whole PBKDF2 digests, partial-verification
/// tails). `bin64` shares the same alphabet; the two names exist because the
/// wire format treats them as distinct fields side by side (spec.md §4.3).
pub fn b64_encode(data: &[u8]) -> String {
    B64.encode(data)
}

pub fn bin64_encode(data: &[u8]) -> String {
    B64.encode(data)
}

pub fn b64_decode(s: &str) -> Result<Vec<u8>> {
    B64.decode(s)
        .map_err(|e| Error::Parse(format!("invalid base64: {e}")))
}

/// The fixed character width of the standard padded base64 encoding of `n`
/// bytes: `ceil(n / 3) * 4`. Used to split a `passhash` field into its
/// transformed prefix and its partial-verification suffix without needing a
/// separator character (see SPEC_FULL.md §4.3).
pub fn partial_b64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}

/// Strip a salt that is wrapped in a leading and trailing `$`, per spec.md
/// §4.4 step 2's "new threshold account" convention. Returns `None` if the
/// salt is not wrapped.
pub fn strip_wrapped_salt(salt: &str) -> Option<&str> {
    if salt.len() >= 2 && salt.starts_with('$') && salt.ends_with('$') {
        Some(&salt[1..salt.len() - 1])
    } else {
        None
    }
}
