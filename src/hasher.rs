//! The engine: `encode`, `verify`, `must_update`, `safe_summary`, and the
//! internal `protect`/`partial_verify`/`get_share_from_hash`/`recombine`/
//! `verify_secret`/`upgrade_locked_verifier` operations (spec.md §4.4–§4.10).

use std::sync::Mutex;

use chrono::Utc;

use crate::codec::{
    EncodedVerifier, b64_decode, b64_encode, bin64_encode, decode_verifier, encode_verifier,
    partial_b64_len, strip_wrapped_salt,
};
use crate::digest::{HASH_LEN, aes_ecb_encrypt_32, ct_eq, pbkdf2_hmac_sha256, resize_to, sha256, xor};
use crate::domain::{EngineConfig, ShareNumber};
use crate::error::{Error, Result};
use crate::shamir::ShamirSecret;
use crate::state::{EngineState, KvCache, PartialHashRecord, StateStore};

/// The API-level verification outcome (Design Note 3): `Locked` is a result
/// variant, not an exception, matching the source's `LockedException` raised
/// from `verify` reimagined as an explicit tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    NoMatch,
    Locked,
}

pub struct Hasher<C: KvCache> {
    config: EngineConfig,
    store: StateStore<C>,
    state: Mutex<EngineState>,
}

impl<C: KvCache> Hasher<C> {
    pub fn new(cache: C, config: EngineConfig) -> Self {
        let store = StateStore::new(cache);
        let initial = store.load();
        Self {
            config,
            store,
            state: Mutex::new(initial),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reload from the KV cache when the in-process copy is locked, so a
    /// sibling process's progress toward unlock is observed (spec.md §5).
    fn refresh(&self, state: &mut EngineState) {
        if !state.is_unlocked {
            *state = self.store.load();
        }
    }

    pub fn encode(&self, password: &[u8], salt: &str, iterations: Option<u32>) -> Result<String> {
        if password.is_empty() {
            return Err(Error::Parse("password must not be empty".into()));
        }
        if salt.is_empty() {
            return Err(Error::Parse("salt must not be empty".into()));
        }
        let iterations = iterations.unwrap_or(self.config.iterations());

        let mut state = self.state.lock().expect("engine lock poisoned");
        self.refresh(&mut state);

        let (share_number, real_salt): (ShareNumber, &str) = match strip_wrapped_salt(salt) {
            Some(inner) => {
                let allocated = ShareNumber::new(state.next_share)?;
                let next = allocated.next()?;
                state.next_share = *next;
                self.store.save(&state);
                log::debug!("allocated share {} for a new threshold account", *allocated);
                (allocated, inner)
            }
            None => (ShareNumber::THRESHOLDLESS, salt),
        };

        let h = pbkdf2_hmac_sha256(password, real_salt.as_bytes(), iterations);

        if !state.is_unlocked || state.threshold_key.is_none() {
            let share_field = format!("-{}", *share_number);
            let passhash = b64_encode(&h);
            return Ok(encode_verifier(&share_field, iterations, real_salt, &passhash));
        }

        let passhash = self.protect(&state, &h, share_number)?;
        let share_field = format!("{}", *share_number);
        Ok(encode_verifier(&share_field, iterations, real_salt, &passhash))
    }

    pub fn verify(&self, password: &[u8], encoded: &str) -> Result<Verification> {
        let ev = decode_verifier(encoded)?;
        if ev.algorithm != crate::codec::ALGORITHM {
            return Err(Error::Parse(format!("unrecognized algorithm {}", ev.algorithm)));
        }

        if let Some(_latent) = ev.raw_share.strip_prefix('-') {
            let h = pbkdf2_hmac_sha256(password, ev.salt.as_bytes(), ev.iterations);
            let expected = b64_encode(&h);
            return Ok(if ct_eq(expected.as_bytes(), ev.passhash.as_bytes()) {
                Verification::Match
            } else {
                Verification::NoMatch
            });
        }

        let n: u8 = ev
            .raw_share
            .parse()
            .map_err(|_| Error::Parse(format!("non-numeric share field: {}", ev.raw_share)))?;
        let share_number = ShareNumber::new(n)?;

        let mut state = self.state.lock().expect("engine lock poisoned");
        self.refresh(&mut state);

        let h = pbkdf2_hmac_sha256(password, ev.salt.as_bytes(), ev.iterations);

        if state.is_unlocked && state.threshold_key.is_some() {
            let expected_passhash = self.protect(&state, &h, share_number)?;
            let partial_matched = self.partial_verify(&mut state, encoded, &ev, share_number, &h);
            let full_matched = ct_eq(expected_passhash.as_bytes(), ev.passhash.as_bytes());
            if partial_matched && !full_matched {
                log::warn!(
                    "possible database leak: partial bytes matched but full verifier did not (share {n})"
                );
            }
            return Ok(if full_matched {
                Verification::Match
            } else {
                Verification::NoMatch
            });
        }

        // Locked path (spec.md §4.5 steps 5-6).
        if !share_number.is_thresholdless() {
            let candidate = self.get_share_from_hash(&ev, &h)?;
            match state.candidate_shares.get(&n) {
                Some(existing) if !ct_eq(existing, &candidate) => {
                    return Err(Error::ShareConflict { share: n });
                }
                Some(_) => {}
                None => {
                    state.candidate_shares.insert(n, candidate);
                    self.store.save(&state);
                    log::debug!(
                        "admitted candidate share {n} ({}/{} toward threshold)",
                        state.candidate_shares.len(),
                        *self.config.threshold()
                    );
                }
            }
            if state.candidate_shares.len() >= *self.config.threshold() as usize {
                self.recombine(&mut state)?;
            }
        }

        let partial_bytes = *self.config.partial_bytes() as usize;
        if partial_bytes > 0 {
            let matched = self.partial_verify(&mut state, encoded, &ev, share_number, &h);
            Ok(if matched { Verification::Match } else { Verification::Locked })
        } else {
            Ok(Verification::Locked)
        }
    }

    pub fn must_update(&self, encoded: &str) -> Result<bool> {
        let ev = decode_verifier(encoded)?;
        Ok(ev.iterations != self.config.iterations())
    }

    /// `algorithm, sharenumber, iterations, salt (masked), hash (masked)`
    /// (spec.md §6).
    pub fn safe_summary(&self, encoded: &str) -> Result<Vec<(String, String)>> {
        let ev = decode_verifier(encoded)?;
        Ok(vec![
            ("algorithm".to_string(), ev.algorithm),
            ("sharenumber".to_string(), ev.raw_share),
            ("iterations".to_string(), ev.iterations.to_string()),
            ("salt".to_string(), mask(&ev.salt)),
            ("hash".to_string(), mask(&ev.passhash)),
        ])
    }

    /// Rewrites a locked-mode (`-n`) verifier into protected form using only
    /// the hash already stored (no password needed: the locked entry already
    /// holds the full PBKDF2 digest in the clear). `Ok(None)` means `encoded`
    /// was not a locked-mode entry. Used by [`crate::user_store::UserSweeper`].
    pub(crate) fn upgrade_locked_verifier(&self, encoded: &str) -> Result<Option<String>> {
        let ev = decode_verifier(encoded)?;
        let Some(latent) = ev.raw_share.strip_prefix('-') else {
            return Ok(None);
        };
        let latent_n: u8 = latent
            .parse()
            .map_err(|_| Error::Parse(format!("invalid latent share number: {latent}")))?;

        let h_bytes = b64_decode(&ev.passhash)?;
        if h_bytes.len() != HASH_LEN {
            return Err(Error::Parse("locked verifier hash is not 32 bytes".into()));
        }
        let mut h = [0u8; HASH_LEN];
        h.copy_from_slice(&h_bytes);

        let mut state = self.state.lock().expect("engine lock poisoned");
        if !state.is_unlocked {
            return Err(Error::Config(
                "cannot upgrade a locked verifier before the engine unlocks".into(),
            ));
        }

        // spec.md §4.10: thresholdless stays share 0; a latent threshold
        // account gets a *fresh* share number, not its old latent one.
        let share_number = if latent_n == 0 {
            ShareNumber::THRESHOLDLESS
        } else {
            let allocated = ShareNumber::new(state.next_share)?;
            let next = allocated.next()?;
            state.next_share = *next;
            allocated
        };

        let passhash = self.protect(&state, &h, share_number)?;
        self.store.save(&state);

        let share_field = format!("{}", *share_number);
        Ok(Some(encode_verifier(&share_field, ev.iterations, &ev.salt, &passhash)))
    }

    /// AES for thresholdless, Shamir XOR for threshold accounts; the
    /// transformed `(32 - P)`-byte prefix and the plain `P`-byte tail
    /// concatenated (spec.md §4.4 steps 5-6).
    fn protect(&self, state: &EngineState, h: &[u8; HASH_LEN], share_number: ShareNumber) -> Result<String> {
        let threshold_key_bytes = state
            .threshold_key
            .as_ref()
            .ok_or_else(|| Error::Config("protect called without a threshold_key".into()))?;
        let mut threshold_key = [0u8; HASH_LEN];
        threshold_key.copy_from_slice(threshold_key_bytes);

        let pp = if share_number.is_thresholdless() {
            aes_ecb_encrypt_32(&threshold_key, h)
        } else {
            let basis = state
                .shamir_basis
                .clone()
                .ok_or_else(|| Error::Config("protect called without a shamir basis".into()))?;
            let shamir = ShamirSecret::from_basis(*self.config.threshold(), basis);
            let share = shamir.compute_share(*share_number);
            let share_bytes = resize_to(&share.y, HASH_LEN);
            let xored = xor(h, &share_bytes);
            let mut out = [0u8; HASH_LEN];
            out.copy_from_slice(&xored);
            out
        };

        let p = *self.config.partial_bytes() as usize;
        let prefix = bin64_encode(&pp[..HASH_LEN - p]);
        let suffix = b64_encode(&h[HASH_LEN - p..]);
        Ok(format!("{prefix}{suffix}"))
    }

    /// Recompute the share prefix implied by `(password, stored)`: decode the
    /// transformed portion and XOR against the recomputed hash prefix
    /// (spec.md §4.7).
    fn get_share_from_hash(&self, ev: &EncodedVerifier, h: &[u8; HASH_LEN]) -> Result<Vec<u8>> {
        let p = *self.config.partial_bytes() as usize;
        let suffix_len = partial_b64_len(p);
        if ev.passhash.len() < suffix_len {
            return Err(Error::Parse("passhash too short for configured partial_bytes".into()));
        }
        let prefix_b64 = &ev.passhash[..ev.passhash.len() - suffix_len];
        let decoded = b64_decode(prefix_b64)?;
        let h_prefix = &h[..HASH_LEN - p];
        if decoded.len() != h_prefix.len() {
            return Err(Error::Parse("decoded share prefix has unexpected length".into()));
        }
        Ok(xor(&decoded, h_prefix))
    }

    /// Compare the trailing plaintext partial-verification bytes; record a
    /// match (insert-only) into `partial_hashes` (spec.md §4.6).
    fn partial_verify(
        &self,
        state: &mut EngineState,
        encoded: &str,
        ev: &EncodedVerifier,
        share_number: ShareNumber,
        h: &[u8; HASH_LEN],
    ) -> bool {
        let p = *self.config.partial_bytes() as usize;
        if p == 0 {
            return false;
        }
        let suffix_len = partial_b64_len(p);
        if ev.passhash.len() < suffix_len {
            return false;
        }
        let stored_suffix = &ev.passhash[ev.passhash.len() - suffix_len..];
        let own_suffix = b64_encode(&h[HASH_LEN - p..]);
        let matched = ct_eq(stored_suffix.as_bytes(), own_suffix.as_bytes());
        if matched && !state.partial_hashes.contains_key(encoded) {
            state.partial_hashes.insert(
                encoded.to_string(),
                PartialHashRecord {
                    share_number: *share_number,
                    salted_hash_b64: b64_encode(h),
                },
            );
            self.store.save(state);
        }
        matched
    }

    /// Locked → Unlocked transition (spec.md §4.8). Idempotent once unlocked
    /// (invariant 8).
    fn recombine(&self, state: &mut EngineState) -> Result<()> {
        if state.is_unlocked {
            return Ok(());
        }

        let threshold = *self.config.threshold();
        let shares: Vec<(u8, Vec<u8>)> = state
            .candidate_shares
            .iter()
            .map(|(n, bytes)| (*n, bytes.clone()))
            .collect();
        let shamir = ShamirSecret::recover_secretdata(threshold, &shares)?;
        let secret = shamir.secretdata();
        self.verify_secret(&secret)?;

        let threshold_key = resize_to(&secret, HASH_LEN);

        state.secret = Some(secret);
        state.threshold_key = Some(threshold_key.clone());
        state.shamir_basis = Some(shamir.basis().to_vec());
        state.is_unlocked = true;
        state.last_unlocked = Some(Utc::now());
        log::info!("engine unlocked: threshold reconstruction succeeded");

        self.audit_thresholdless_partial_hashes(state, &threshold_key);

        state.candidate_shares.clear();
        self.store.save(state);
        Ok(())
    }

    /// Post-unlock audit (spec.md §4.8 step 5): re-derive the AES form of
    /// every thresholdless partial-hash record and compare against the
    /// stored prefix; mismatches are logged, not fatal.
    fn audit_thresholdless_partial_hashes(&self, state: &EngineState, threshold_key: &[u8]) {
        let mut key = [0u8; HASH_LEN];
        key.copy_from_slice(threshold_key);
        let p = *self.config.partial_bytes() as usize;

        for (encoded, record) in &state.partial_hashes {
            if record.share_number != 0 {
                continue;
            }
            let Ok(h_bytes) = b64_decode(&record.salted_hash_b64) else {
                continue;
            };
            if h_bytes.len() != HASH_LEN {
                continue;
            }
            let mut h = [0u8; HASH_LEN];
            h.copy_from_slice(&h_bytes);
            let pp = aes_ecb_encrypt_32(&key, &h);
            let expected_prefix = bin64_encode(&pp[..HASH_LEN - p]);

            let Ok(stored_ev) = decode_verifier(encoded) else {
                continue;
            };
            let suffix_len = partial_b64_len(p);
            if stored_ev.passhash.len() < suffix_len {
                continue;
            }
            let stored_prefix = &stored_ev.passhash[..stored_ev.passhash.len() - suffix_len];
            if !ct_eq(stored_prefix.as_bytes(), expected_prefix.as_bytes()) {
                log::warn!("possible break-in: post-unlock audit mismatch for a thresholdless verifier");
            }
        }
    }

    /// Fingerprint check (spec.md §4.9), implemented as a direct SHA-256
    /// (Design Note 2).
    fn verify_secret(&self, secret: &[u8]) -> Result<()> {
        let usable = self.config.usable_secret_len();
        let v = self.config.secret_verification_bytes();
        if secret.len() < usable {
            return Err(Error::SecretFingerprintFailed);
        }
        let random = &secret[..usable - v];
        let verification = &secret[usable - v..usable];
        let digest = sha256(random);
        if ct_eq(verification, &digest[..v]) {
            Ok(())
        } else {
            Err(Error::SecretFingerprintFailed)
        }
    }
}

/// Mask all but a short prefix, mirroring the original source's
/// `mask_hash(value, show=6)` convention for `safe_summary`.
fn mask(value: &str) -> String {
    const SHOW: usize = 6;
    let keep = value.len().min(SHOW);
    format!("{}{}", &value[..keep], "*".repeat(value.len() - keep))
}
