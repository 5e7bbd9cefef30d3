//! Password digesting, AES-ECB thresholdless encryption, and the
//! constant-time comparison helper used everywhere a secret-derived byte
//! string is compared (spec.md §4.4, §4.9, §7).

use aes::Aes256;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const HASH_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256(password, salt, iterations, 32).
pub fn pbkdf2_hmac_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

/// Direct SHA-256, used for the secret fingerprint (Design Note 2: the
/// source's PBKDF2-with-one-iteration stands in for a plain digest here).
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// AES-256-ECB-encrypt a 32-byte block pair (Design Note 4.4: the source's
/// default (ECB) mode on a fixed-length uniform hash, preserved exactly).
pub fn aes_ecb_encrypt_32(key: &[u8; 32], plaintext: &[u8; HASH_LEN]) -> [u8; HASH_LEN] {
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut out = [0u8; HASH_LEN];
    for (chunk_in, chunk_out) in plaintext.chunks_exact(16).zip(out.chunks_exact_mut(16)) {
        let mut block = GenericArray::clone_from_slice(chunk_in);
        cipher.encrypt_block(&mut block);
        chunk_out.copy_from_slice(&block);
    }
    out
}

/// XOR two equal-length byte strings. Panics on length mismatch: callers
/// always XOR fixed-size hash/share material of known equal length.
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len(), "xor operands must be equal length");
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Zero-extend or truncate `data` to exactly `len` bytes.
pub fn resize_to(data: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let n = data.len().min(len);
    out[..n].copy_from_slice(&data[..n]);
    out
}

/// Constant-time equality. Length mismatches are treated as inequality, not
/// an error or a panic, per spec.md §7.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
