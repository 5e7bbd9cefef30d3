//! `UserSweeper` (spec.md §4.10) and the ambient user-store seam it runs
//! against (spec.md §1 places the identity store out of scope; this crate
//! only depends on the trait below).
//!
//! Implements the *intended* behavior of the source's locked-hash upgrade
//! path, not its broken composition (Design Notes 1 and 3): the source's
//! `UserSweeper` builds a malformed format string (a literal typo in the
//! field separator) and calls an instance method as if it were free, and its
//! `sharenumber.strip('-')` call discards its own return value so the share
//! number is never actually un-negated. This implementation parses the
//! latent share number correctly and composes the upgraded verifier with
//! [`crate::codec::encode_verifier`].

use chrono::{DateTime, Utc};

use crate::hasher::Hasher;
use crate::state::KvCache;

/// One user record as seen by the ambient identity store.
pub trait UserRecord {
    fn password(&self) -> &str;
    fn set_password(&mut self, encoded: String);
    fn date_joined(&self) -> DateTime<Utc>;
}

/// The ambient user store (spec.md §6): enumerate users who joined since the
/// last unlock, and persist a rewritten verifier back.
pub trait UserStore {
    type User: UserRecord;

    fn users_joined_since(&self, since: DateTime<Utc>) -> Vec<Self::User>;
    fn save(&self, user: &Self::User);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub upgraded: usize,
    pub failed: usize,
    pub skipped_not_locked: usize,
}

/// Scans the ambient user store for locked-mode (`-n`) verifiers and
/// rewrites them into protected form once the engine has unlocked.
pub struct UserSweeper<'a, C: KvCache> {
    hasher: &'a Hasher<C>,
}

impl<'a, C: KvCache> UserSweeper<'a, C> {
    pub fn new(hasher: &'a Hasher<C>) -> Self {
        Self { hasher }
    }

    /// Sweep is best-effort per spec.md §4.10: a failure on one user is
    /// logged and does not abort the sweep.
    pub fn sweep<S: UserStore>(&self, store: &S, since: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        for mut user in store.users_joined_since(since) {
            let encoded = user.password().to_string();
            match self.hasher.upgrade_locked_verifier(&encoded) {
                Ok(Some(upgraded)) => {
                    user.set_password(upgraded);
                    store.save(&user);
                    report.upgraded += 1;
                }
                Ok(None) => {
                    report.skipped_not_locked += 1;
                }
                Err(err) => {
                    log::error!("user sweep: failed to upgrade a locked verifier: {err}");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EngineConfig, PartialBytes, Threshold};
    use crate::state::InMemoryKvCache;
    use std::cell::RefCell;
    use std::sync::Mutex;

    struct FakeUser {
        password: String,
        joined: DateTime<Utc>,
    }

    impl UserRecord for FakeUser {
        fn password(&self) -> &str {
            &self.password
        }
        fn set_password(&mut self, encoded: String) {
            self.password = encoded;
        }
        fn date_joined(&self) -> DateTime<Utc> {
            self.joined
        }
    }

    struct FakeStore {
        users: Mutex<RefCell<Vec<FakeUser>>>,
    }

    impl UserStore for FakeStore {
        type User = FakeUser;

        fn users_joined_since(&self, _since: DateTime<Utc>) -> Vec<FakeUser> {
            self.users
                .lock()
                .unwrap()
                .borrow()
                .iter()
                .map(|u| FakeUser {
                    password: u.password.clone(),
                    joined: u.joined,
                })
                .collect()
        }

        fn save(&self, user: &FakeUser) {
            let guard = self.users.lock().unwrap();
            let mut users = guard.borrow_mut();
            if let Some(existing) = users.iter_mut().find(|u| u.joined == user.joined) {
                existing.password = user.password.clone();
            }
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::with_threshold(Threshold::new(3).unwrap()).unwrap()
    }

    #[test]
    fn sweep_skips_already_unlocked_entries() {
        let hasher = Hasher::new(InMemoryKvCache::default(), config());
        let sweeper = UserSweeper::new(&hasher);
        let store = FakeStore {
            users: Mutex::new(RefCell::new(vec![FakeUser {
                password: "pph$0$12000$salt$notlocked==".to_string(),
                joined: Utc::now(),
            }])),
        };
        let report = sweeper.sweep(&store, Utc::now() - chrono::Duration::days(1));
        assert_eq!(report.skipped_not_locked, 1);
        assert_eq!(report.upgraded, 0);
    }

    #[test]
    fn sweep_logs_and_continues_on_malformed_entry() {
        let hasher = Hasher::new(InMemoryKvCache::default(), config());
        let sweeper = UserSweeper::new(&hasher);
        let store = FakeStore {
            users: Mutex::new(RefCell::new(vec![FakeUser {
                password: "not-a-verifier".to_string(),
                joined: Utc::now(),
            }])),
        };
        let report = sweeper.sweep(&store, Utc::now() - chrono::Duration::days(1));
        assert_eq!(report.failed, 1);
    }

    /// Exercises a genuine upgrade: a locked-mode (`-n`) verifier created
    /// before the engine unlocked gets rewritten into protected form once it
    /// has (spec.md §4.10). `Hasher` never reaches `is_unlocked` on its own
    /// in a single test process (only `recombine` sets it, and that is fed
    /// by verifiers `encode` only mints while already unlocked), so this
    /// seeds the cache with an already-unlocked `EngineState` directly,
    /// standing in for an unlock that happened earlier in the process.
    #[test]
    fn sweep_upgrades_a_locked_threshold_entry_once_unlocked() {
        use crate::codec::{b64_encode, decode_verifier, encode_verifier};
        use crate::digest::{HASH_LEN, pbkdf2_hmac_sha256, resize_to, sha256};
        use crate::hasher::Verification;
        use crate::shamir::ShamirSecret;
        use crate::state::{EngineState, STATE_KEY};
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let cfg = config();
        let usable = cfg.usable_secret_len();
        let v = cfg.secret_verification_bytes();
        let mut secret = vec![0u8; usable];
        for (i, b) in secret.iter_mut().enumerate().take(usable - v) {
            *b = i as u8 + 1;
        }
        let digest = sha256(&secret[..usable - v]);
        secret[usable - v..usable].copy_from_slice(&digest[..v]);

        let mut rng = StdRng::seed_from_u64(0x5EED);
        let shamir = ShamirSecret::split(*cfg.threshold(), &secret, &mut rng).unwrap();
        let threshold_key = resize_to(&secret, HASH_LEN);

        let state = EngineState {
            is_unlocked: true,
            secret: Some(secret),
            threshold_key: Some(threshold_key),
            shamir_basis: Some(shamir.basis().to_vec()),
            next_share: 5,
            ..EngineState::default()
        };
        let cache = InMemoryKvCache::default();
        cache.set(STATE_KEY, serde_json::to_vec(&state).unwrap());
        let hasher = Hasher::new(cache, cfg);
        let sweeper = UserSweeper::new(&hasher);

        let salt = "legacy-salt";
        let iterations = cfg.iterations();
        let h = pbkdf2_hmac_sha256(b"hunter2", salt.as_bytes(), iterations);
        let legacy = encode_verifier("-3", iterations, salt, &b64_encode(&h));

        let store = FakeStore {
            users: Mutex::new(RefCell::new(vec![FakeUser {
                password: legacy,
                joined: Utc::now(),
            }])),
        };

        let report = sweeper.sweep(&store, Utc::now() - chrono::Duration::days(1));
        assert_eq!(report.upgraded, 1);
        assert_eq!(report.failed, 0);

        let upgraded = store.users.lock().unwrap().borrow()[0].password.clone();
        let ev = decode_verifier(&upgraded).unwrap();
        assert!(!ev.raw_share.starts_with('-'));
        assert_eq!(hasher.verify(b"hunter2", &upgraded).unwrap(), Verification::Match);
    }
}
